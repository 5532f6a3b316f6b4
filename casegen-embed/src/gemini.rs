//! Remote embedding provider backed by the Gemini `batchEmbedContents` API

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use crate::provider::{Embedding, EmbeddingProvider, EmbeddingResult, TaskType, normalize};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: &'static str,
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
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
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

/// Embedding provider that calls the Gemini REST API.
///
/// Texts are sent in batches of at most `batch_size`. Any failure is returned
/// to the caller as-is; there is no retry.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    config: EmbedConfig,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a provider using the API key from the configured environment variable.
    pub fn from_env(config: EmbedConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::with_api_key(config, api_key)
    }

    /// Create a provider with an explicit API key.
    pub fn with_api_key<S: Into<String>>(config: EmbedConfig, api_key: S) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            config,
            api_key: api_key.into(),
            client,
        })
    }

    fn model_path(&self) -> String {
        if self.config.model_name.starts_with("models/") {
            self.config.model_name.clone()
        } else {
            format!("models/{}", self.config.model_name)
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:batchEmbedContents",
            self.config.api_base.trim_end_matches('/'),
            self.model_path()
        )
    }

    fn build_request<'a>(&self, texts: &'a [String], task: TaskType) -> BatchEmbedRequest<'a> {
        let model = self.model_path();
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: model.clone(),
                    content: Content {
                        parts: vec![Part { text }],
                    },
                    task_type: task.api_name(),
                })
                .collect(),
        }
    }

    async fn embed_batch(&self, texts: &[String], task: TaskType) -> Result<Vec<Embedding>> {
        let body = self.build_request(texts, task);
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
            tracing::warn!("Gemini embedding request failed with status {}", status);
            return Err(EmbedError::Provider {
                status: status.as_u16(),
                message: error_message(&payload),
            });
        }

        parse_embeddings(&payload, texts.len())
    }
}

fn error_message(payload: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(payload)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| payload.trim().to_string())
}

fn parse_embeddings(payload: &str, expected: usize) -> Result<Vec<Embedding>> {
    let response: BatchEmbedResponse = serde_json::from_str(payload)
        .map_err(|e| EmbedError::External { source: e.into() })?;

    if response.embeddings.len() != expected {
        return Err(EmbedError::UnexpectedResponse {
            expected,
            found: response.embeddings.len(),
        });
    }
    Ok(response.embeddings.into_iter().map(|e| e.values).collect())
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    async fn embed_texts(&self, texts: &[String], task: TaskType) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!("Requesting {} Gemini embeddings as {}", texts.len(), task);

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size) {
            let mut batch = self.embed_batch(chunk, task).await?;
            if self.config.normalize {
                batch.iter_mut().for_each(|e| normalize(e));
            }
            all_embeddings.extend(batch);
        }

        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.config.dimension
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}
