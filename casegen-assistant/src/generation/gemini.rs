//! Test case generation through the Gemini `generateContent` API

use super::{GenerationRequest, GeneratorConfig, TestCaseGenerator};
use crate::error::{AssistantError, Result};
use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    config: GeneratorConfig,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn from_env(config: &GeneratorConfig) -> Result<Self> {
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Self::with_api_key(config.clone(), key),
            _ => Err(AssistantError::Config(format!(
                "generator API key not found in environment variable {}",
                config.api_key_env
            ))),
        }
    }

    pub fn with_api_key<S: Into<String>>(config: GeneratorConfig, api_key: S) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AssistantError::Config(e.to_string()))?;
        Ok(Self {
            config,
            api_key: api_key.into(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        let model = self
            .config
            .model
            .strip_prefix("models/")
            .unwrap_or(&self.config.model);
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            model
        )
    }
}

fn parse_text(payload: &str) -> anyhow::Result<String> {
    let response: GenerateResponse =
        serde_json::from_str(payload).context("decoding generateContent response")?;
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().map(|part| part.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        bail!("model returned no text");
    }
    Ok(text)
}

fn error_message(payload: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(payload)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| payload.trim().to_string())
}

#[async_trait]
impl TestCaseGenerator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        tracing::debug!(
            "Requesting test cases for '{}' from {} ({} prompt bytes)",
            request.feature,
            self.config.model,
            request.prompt.len()
        );

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
        };
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!(
                "model returned {}: {}",
                status.as_u16(),
                error_message(&payload)
            ));
        }
        parse_text(&payload)
    }

    fn generator_name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let config = GeneratorConfig {
            model: "models/gemini-1.5-flash".to_string(),
            api_base: "http://localhost:9000/v1beta/".to_string(),
            ..GeneratorConfig::default()
        };
        let generator = GeminiGenerator::with_api_key(config, "k").unwrap();
        assert_eq!(
            generator.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_parse_text_joins_parts() {
        let payload = r#"{"candidates": [{"content": {"parts": [{"text": "TC-1 "}, {"text": "TC-2"}], "role": "model"}}]}"#;
        assert_eq!(parse_text(payload).unwrap(), "TC-1 TC-2");
    }

    #[test]
    fn test_parse_text_rejects_empty() {
        assert!(parse_text(r#"{"candidates": []}"#).is_err());
        assert!(parse_text(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).is_err());
        assert!(parse_text("not json").is_err());
    }

    #[test]
    fn test_missing_key() {
        let config = GeneratorConfig {
            api_key_env: "CASEGEN_TEST_UNSET_GENERATOR_KEY".to_string(),
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            GeminiGenerator::from_env(&config),
            Err(AssistantError::Config(_))
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        let payload = r#"{"error": {"code": 429, "message": "Resource exhausted"}}"#;
        assert_eq!(error_message(payload), "Resource exhausted");
    }
}
