//! Configuration for embedding providers

use crate::error::{EmbedError, Result};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Model used by the Gemini embedding endpoint.
pub const DEFAULT_MODEL_NAME: &str = "embedding-001";

/// Width of `embedding-001` vectors.
pub const DEFAULT_DIMENSION: usize = 768;

/// Base URL of the Gemini REST API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable the API key is read from.
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Which embedding backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Deterministic offline feature hashing
    #[default]
    Hashing,
    /// Remote Gemini embedding API
    Gemini,
    /// Local ONNX model (requires the `fastembed` cargo feature)
    FastEmbed,
}

/// Configuration for embedding providers
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
#[serde(default)]
pub struct EmbedConfig {
    /// Backend to use
    #[builder(default)]
    pub provider: ProviderKind,
    /// Name of the embedding model
    #[builder(default = "DEFAULT_MODEL_NAME.to_string()")]
    pub model_name: String,
    /// Width of produced vectors
    #[builder(default = "DEFAULT_DIMENSION")]
    pub dimension: usize,
    /// Maximum number of texts sent in one provider call
    #[builder(default = "32")]
    pub batch_size: usize,
    /// Whether to L2-normalize embeddings
    #[builder(default = "true")]
    pub normalize: bool,
    /// Base URL for remote providers
    #[builder(default = "DEFAULT_API_BASE.to_string()")]
    pub api_base: String,
    /// Environment variable holding the API key for remote providers
    #[builder(default = "DEFAULT_API_KEY_ENV.to_string()")]
    pub api_key_env: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            dimension: DEFAULT_DIMENSION,
            batch_size: 32,
            normalize: true,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl EmbedConfig {
    /// Create a new embedding configuration using the builder
    pub fn builder() -> EmbedConfigBuilder {
        EmbedConfigBuilder::default()
    }

    /// Offline hashing provider producing vectors of the given width
    pub fn hashing(dimension: usize) -> Self {
        Self {
            provider: ProviderKind::Hashing,
            model_name: "fnv-hashing".to_string(),
            dimension,
            ..Self::default()
        }
    }

    /// Gemini `embedding-001` with the key taken from `GEMINI_API_KEY`
    pub fn gemini() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            batch_size: 100,
            ..Self::default()
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// Point a remote provider at a different base URL (builder style)
    pub fn with_api_base<S: Into<String>>(self, api_base: S) -> Self {
        Self {
            api_base: api_base.into(),
            ..self
        }
    }

    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(EmbedError::MissingApiKey {
                var: self.api_key_env.clone(),
            }),
        }
    }

    /// Check the settings are usable for the selected provider
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be at least 1"));
        }
        if self.dimension == 0 {
            return Err(EmbedError::invalid_config("dimension must be at least 1"));
        }
        if self.model_name.trim().is_empty() {
            return Err(EmbedError::invalid_config("model_name must not be empty"));
        }
        if self.provider == ProviderKind::Gemini && self.api_base.trim().is_empty() {
            return Err(EmbedError::invalid_config(
                "api_base is required for the gemini provider",
            ));
        }

        tracing::debug!("Embedding config validated for: {}", self.model_name);
        Ok(())
    }
}
