// src/services/completion_services.rs
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::Config;
use crate::dtos::chat::{ChatCompletionResponse, ChatMessage, ChatRequest};

pub const MAX_TOKENS: u32 = 1000;
pub const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication rejected ({status}): {body}")]
    Unauthorized { status: StatusCode, body: String },
    #[error("rate limited: {body}")]
    RateLimited { body: String },
    #[error("api error {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("invalid json in completion response: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
        body: String,
    },
    #[error("completion response has no message content")]
    EmptyResponse,
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
}

/// Thin client over an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct CompletionService {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CompletionService {
    pub fn new(config: &Config) -> Result<Self, CompletionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "http-referer",
            HeaderValue::from_str(&config.referer)
                .map_err(|_| CompletionError::InvalidHeader("HTTP-Referer"))?,
        );
        headers.insert(
            "x-title",
            HeaderValue::from_str(&config.app_title)
                .map_err(|_| CompletionError::InvalidHeader("X-Title"))?,
        );

        let client = Client::builder()
            .user_agent("persona-extract/0.1")
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Sends one system + user exchange and returns the first choice's text.
    pub async fn complete(
        &self,
        model: &str,
        system_instruction: &str,
        prompt: &str,
    ) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model,
            messages: vec![ChatMessage::system(system_instruction), ChatMessage::user(prompt)],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {} model={}", url, model);

        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", &self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            warn!("completion request failed: {} {}", status, text);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    CompletionError::Unauthorized { status, body: text }
                }
                StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited { body: text },
                _ => CompletionError::Api { status, body: text },
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|source| CompletionError::InvalidJson { source, body: text })?;

        parsed.first_content().ok_or(CompletionError::EmptyResponse)
    }
}
