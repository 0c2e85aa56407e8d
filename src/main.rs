// src/main.rs
mod config;
mod dtos;
mod handlers;
mod models;
mod services;

use std::env;
use anyhow::{Context, Result};
use log::info;

use crate::config::SETTINGS_FILE;
use crate::handlers::profile_handlers::{present_profile, run};

const PROMPT: &str = "Create a profile of a fictional girl character from Hoyoverse games \
(Genshin Impact, Honkai Impact 3rd, etc.) who specializes in Python and machine learning.";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if dotenv::dotenv().is_err() {
        info!("no {} file found, using process environment only", SETTINGS_FILE);
    }

    let profile = run(|name| env::var(name).ok(), PROMPT)
        .await
        .context("configuration error")?;

    if let Some(profile) = profile {
        present_profile(&profile).context("failed to write profile to stdout")?;
    }
    Ok(())
}
