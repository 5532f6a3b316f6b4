//! Embedding provider trait and shared types

use crate::config::{EmbedConfig, ProviderKind};
use crate::error::{EmbedError, Result};
use crate::gemini::GeminiProvider;
use crate::hashing::HashingProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A fixed-length vector produced by a provider.
pub type Embedding = Vec<f32>;

/// How the embedded text is going to be used.
///
/// Providers may return different vectors for the same text depending on the
/// mode. The two modes are not interchangeable: stored chunks must be embedded
/// as documents and searches as queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Text that will be stored and searched against
    RetrievalDocument,
    /// Text that is searched with
    RetrievalQuery,
}

impl TaskType {
    /// Wire name used by the Gemini API.
    pub fn api_name(self) -> &'static str {
        match self {
            Self::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            Self::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetrievalDocument => f.write_str("retrieval_document"),
            Self::RetrievalQuery => f.write_str("retrieval_query"),
        }
    }
}

/// Result of embedding generation
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Embedding>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result.
    ///
    /// The dimension is inferred from the first embedding vector and is 0
    /// for an empty result.
    pub fn new(embeddings: Vec<Embedding>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Returns the number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding providers that can generate embeddings from text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for multiple texts (batch processing)
    async fn embed_texts(&self, texts: &[String], task: TaskType) -> Result<EmbeddingResult>;

    /// Generate an embedding for a single text
    async fn embed_text(&self, text: &str, task: TaskType) -> Result<Embedding> {
        let texts = vec![text.to_string()];
        let result = self.embed_texts(&texts, task).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or(EmbedError::UnexpectedResponse {
                expected: 1,
                found: 0,
            })
    }

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// Build the provider selected by `config`.
pub fn create_provider(config: &EmbedConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    config.validate()?;
    tracing::info!(
        "Creating {:?} embedding provider for model: {}",
        config.provider,
        config.model_name
    );

    match config.provider {
        ProviderKind::Hashing => Ok(Arc::new(HashingProvider::new(config.clone()))),
        ProviderKind::Gemini => Ok(Arc::new(GeminiProvider::from_env(config.clone())?)),
        #[cfg(feature = "fastembed")]
        ProviderKind::FastEmbed => Ok(Arc::new(crate::local::FastEmbedProvider::new(
            config.clone(),
        )?)),
        #[cfg(not(feature = "fastembed"))]
        ProviderKind::FastEmbed => Err(EmbedError::invalid_config(
            "the fastembed provider requires building with the `fastembed` feature",
        )),
    }
}

/// Scale `vector` to unit length in place. Zero vectors are left alone.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
