use serde_json::Value;
use thiserror::Error;

use crate::models::profile::{FieldViolation, Profile};
use crate::services::completion_services::CompletionError;

pub const SYSTEM_INSTRUCTION: &str = r#"You are an assistant that always answers in JSON.
Your answer must be a valid JSON object matching this schema:
{
    "name": "string",
    "age": number,
    "occupation": "string",
    "skills": ["string", "string", ...],
    "appearance": "string",
    "personality": "string",
    "history": "string",
    "bio": "string" (optional)
}"#;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("completion request failed: {0}")]
    Completion(#[from] CompletionError),
    #[error("no JSON object found in model response")]
    NoJson { raw: String },
    #[error("invalid JSON in model response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        text: String,
    },
    #[error("profile validation failed: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Slice from the first `{` to the last `}`, inclusive. Braces are not
/// balanced, so several objects or braces inside strings can widen the slice.
pub fn extract_json_candidate(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

pub fn parse_profile(candidate: &str) -> Result<Profile, ProfileError> {
    let value: Value = serde_json::from_str(candidate).map_err(|source| ProfileError::Decode {
        source,
        text: candidate.to_string(),
    })?;

    Profile::from_value(&value).map_err(ProfileError::Validation)
}

pub fn build_profile(raw: &str) -> Result<Profile, ProfileError> {
    let candidate = extract_json_candidate(raw).ok_or_else(|| ProfileError::NoJson {
        raw: raw.to_string(),
    })?;
    parse_profile(candidate)
}
