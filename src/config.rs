use log::info;
use thiserror::Error;

pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";
pub const SETTINGS_FILE: &str = ".env";

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "google/gemma-3-4b-it:free";
const DEFAULT_REFERER: &str = "http://localhost:8000";
const DEFAULT_APP_TITLE: &str = "Persona Extract Demo";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} is not set; add it to the {settings_file} file in the working directory")]
    MissingVar {
        var: &'static str,
        settings_file: &'static str,
    },
}

/// Settings for one run, read from the environment after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub referer: String,
    pub app_title: String,
}

impl Config {
    /// Builds the config from any variable source. The API key is checked
    /// first so nothing else runs without it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingVar {
                var: API_KEY_VAR,
                settings_file: SETTINGS_FILE,
            })?;

        info!("API key loaded: {}", mask_key(&api_key));

        let setting = |name: &str, default: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            api_key,
            base_url: setting("OPENROUTER_BASE_URL", DEFAULT_BASE_URL),
            model: setting("OPENROUTER_MODEL", DEFAULT_MODEL),
            referer: setting("OPENROUTER_REFERER", DEFAULT_REFERER),
            app_title: setting("OPENROUTER_APP_TITLE", DEFAULT_APP_TITLE),
        })
    }
}

pub fn mask_key(k: &str) -> String {
    if k.len() <= 8 || !k.is_ascii() { "[REDACTED]".to_string() }
    else { format!("{}***{}", &k[..4], &k[k.len()-4..]) }
}
