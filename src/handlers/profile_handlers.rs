// src/handlers/profile_handlers.rs
use std::error::Error;
use std::io::{self, Write};
use log::{debug, error, info};

use crate::config::{Config, ConfigError};
use crate::models::profile::Profile;
use crate::services::completion_services::{CompletionError, CompletionService};
use crate::services::profile_services::{build_profile, ProfileError, SYSTEM_INSTRUCTION};

/// Request -> extract -> validate. The service is passed in, never global.
pub async fn generate_profile(
    svc: &CompletionService,
    model: &str,
    prompt: &str,
) -> Result<Profile, ProfileError> {
    info!("requesting profile from {}", model);
    let raw = svc.complete(model, SYSTEM_INSTRUCTION, prompt).await?;
    debug!("raw model response: {}", raw);

    let profile = build_profile(&raw)?;
    info!("profile validated: {}", profile.name);
    Ok(profile)
}

/// Loads config through `lookup`, then runs one request. A missing API key is
/// returned as `Err` before any client exists; every later failure is logged
/// and reported as `Ok(None)`.
pub async fn run<F>(lookup: F, prompt: &str) -> Result<Option<Profile>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = Config::from_lookup(lookup)?;

    let svc = match CompletionService::new(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to build http client: {}", e);
            return Ok(None);
        }
    };

    match generate_profile(&svc, &config.model, prompt).await {
        Ok(profile) => Ok(Some(profile)),
        Err(e) => {
            report_failure(&e);
            Ok(None)
        }
    }
}

fn report_failure(err: &ProfileError) {
    match err {
        ProfileError::Completion(CompletionError::InvalidJson { source, body }) => {
            error!("model request failed: unreadable completion response: {}", source);
            error!("response was: {}", body);
        }
        ProfileError::Completion(e @ CompletionError::Http(_)) => {
            error!("model request failed: {}", with_causes(e));
        }
        ProfileError::Completion(e) => error!("model request failed: {}", e),
        ProfileError::NoJson { raw } => {
            error!("could not find JSON in model response");
            error!("response was: {}", raw);
        }
        ProfileError::Decode { source, text } => {
            error!("JSON decode error: {}", source);
            error!("offending text: {}", text);
        }
        ProfileError::Validation(violations) => {
            error!("profile failed validation ({} problem(s))", violations.len());
            for v in violations {
                error!("  {}", v);
            }
        }
    }
}

/// `err: cause: cause ...`, following `source()` to the root.
fn with_causes(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut cause = err.source();
    while let Some(c) = cause {
        out.push_str(": ");
        out.push_str(&c.to_string());
        cause = c.source();
    }
    out
}

pub fn write_profile<W: Write>(out: &mut W, profile: &Profile) -> io::Result<()> {
    writeln!(out, "Validated profile:")?;
    writeln!(out, "Name: {}", profile.name)?;
    writeln!(out, "Age: {}", profile.age)?;
    writeln!(out, "Occupation: {}", profile.occupation)?;
    writeln!(out, "Skills: {}", profile.skills.join(", "))?;
    writeln!(out, "Appearance: {}", profile.appearance)?;
    writeln!(out, "Personality: {}", profile.personality)?;
    writeln!(out, "History: {}", profile.history)?;
    if let Some(bio) = &profile.bio {
        writeln!(out, "Bio: {}", bio)?;
    }

    let json = serde_json::to_string_pretty(profile).map_err(io::Error::other)?;
    writeln!(out)?;
    writeln!(out, "As JSON:")?;
    writeln!(out, "{}", json)
}

pub fn present_profile(profile: &Profile) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_profile(&mut out, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample(bio: Option<&str>) -> Profile {
        Profile::from_value(&json!({
            "name": "Kirara",
            "age": 19,
            "occupation": "ML engineer",
            "skills": ["Python", "PyTorch", "NumPy"],
            "appearance": "Silver hair",
            "personality": "Curious",
            "history": "Raised in Inazuma",
            "bio": bio
        }))
        .unwrap()
    }

    fn render(p: &Profile) -> String {
        let mut buf = Vec::new();
        write_profile(&mut buf, p).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn lookup_for(base_url: String, key: Option<&'static str>) -> impl Fn(&str) -> Option<String> {
        move |name: &str| match name {
            "OPENROUTER_API_KEY" => key.map(str::to_string),
            "OPENROUTER_BASE_URL" => Some(base_url.clone()),
            _ => None,
        }
    }

    fn reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    #[test]
    fn prints_fields_in_order_then_json() {
        let out = render(&sample(Some("Short bio")));
        let order = ["Name: Kirara", "Age: 19", "Occupation:", "Skills: Python, PyTorch, NumPy",
            "Appearance:", "Personality:", "History:", "Bio: Short bio", "As JSON:"];
        let mut last = 0;
        for label in order {
            let at = out[last..].find(label).map(|i| i + last);
            assert!(at.is_some(), "{} missing or out of order", label);
            last = at.unwrap();
        }
        assert!(out.contains("  \"name\": \"Kirara\""));
    }

    #[tokio::test]
    async fn transport_failure_keeps_underlying_cause() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let cfg = Config::from_lookup(|name: &str| match name {
            "OPENROUTER_API_KEY" => Some("sk-or-test-key".to_string()),
            "OPENROUTER_BASE_URL" => Some(format!("http://{}", addr)),
            _ => None,
        })
        .unwrap();
        let svc = CompletionService::new(&cfg).unwrap();
        let err = svc.complete("m", "s", "p").await.unwrap_err();
        assert!(matches!(err, CompletionError::Http(_)));

        let described = with_causes(&err);
        assert!(described.starts_with(&err.to_string()));
        assert!(described.len() > err.to_string().len(), "no cause in {}", described);
    }

    #[test]
    fn omits_bio_line_when_absent() {
        let out = render(&sample(None));
        assert!(!out.contains("Bio:"));
        assert!(out.contains("\"bio\": null"));
    }

    #[tokio::test]
    async fn missing_key_sends_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("{}"))
            .expect(0)
            .mount(&server)
            .await;

        let res = run(lookup_for(server.uri(), None), "prompt").await;
        assert!(matches!(res, Err(ConfigError::MissingVar { var: "OPENROUTER_API_KEY", .. })));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_flow_returns_validated_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(reply(
                "Here is your character:\n```json\n{\"name\":\"A\",\"age\":5,\"occupation\":\"X\",\
                 \"appearance\":\"Y\",\"personality\":\"Z\",\"history\":\"W\"}\n```",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let profile = run(lookup_for(server.uri(), Some("sk-or-test-key")), "prompt")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.name, "A");
        assert!(profile.skills.is_empty());
        assert_eq!(profile.bio, None);
    }

    #[tokio::test]
    async fn recoverable_failures_end_with_no_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("Sorry, I can only chat in prose."))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let lookup = lookup_for(server.uri(), Some("sk-or-test-key"));
        assert!(run(&lookup, "prompt").await.unwrap().is_none());
        assert!(run(&lookup, "prompt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn generate_profile_surfaces_failure_kind() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("{\"name\":\"A\",\"age\":\"twelve\"}"))
            .mount(&server)
            .await;

        let cfg = Config::from_lookup(lookup_for(server.uri(), Some("sk-or-test-key"))).unwrap();
        let svc = CompletionService::new(&cfg).unwrap();
        let err = generate_profile(&svc, &cfg.model, "prompt").await.unwrap_err();
        match err {
            ProfileError::Validation(v) => {
                let fields: Vec<_> = v.iter().map(|x| x.field.as_str()).collect();
                assert_eq!(fields, vec!["age", "occupation", "appearance", "personality", "history"]);
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }
}
