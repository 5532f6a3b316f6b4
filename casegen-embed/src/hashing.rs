//! Offline embedding provider based on feature hashing
//!
//! Each lowercase word and each adjacent word pair is hashed with FNV into one
//! of `dimension` buckets, with the sign taken from a separate hash bit. The
//! result is deterministic across processes and platforms, needs no network or
//! model files, and places texts that share vocabulary close together. It is
//! the default provider for local runs and tests.

use crate::config::EmbedConfig;
use crate::error::Result;
use crate::provider::{Embedding, EmbeddingProvider, EmbeddingResult, TaskType, normalize};
use async_trait::async_trait;
use fnv::FnvHasher;
use std::hash::Hasher;

/// Deterministic bag-of-words embedding provider
#[derive(Debug, Clone)]
pub struct HashingProvider {
    config: EmbedConfig,
}

impl HashingProvider {
    pub fn new(config: EmbedConfig) -> Self {
        Self { config }
    }

    /// Embed one text synchronously.
    ///
    /// The task type does not change the vector, so documents and queries
    /// always land in the same space.
    pub fn embed_sync(&self, text: &str) -> Embedding {
        let dimension = self.config.dimension;
        let mut vector = vec![0.0f32; dimension];
        if dimension == 0 {
            return vector;
        }

        let tokens = tokenize(text);
        for token in &tokens {
            accumulate(&mut vector, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let joined = format!("{} {}", pair[0], pair[1]);
            accumulate(&mut vector, joined.as_bytes(), 0.5);
        }

        if self.config.normalize {
            normalize(&mut vector);
        }
        vector
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn accumulate(vector: &mut [f32], bytes: &[u8], weight: f32) {
    let mut hasher = FnvHasher::default();
    hasher.write(bytes);
    let hash = hasher.finish();

    let bucket = (hash % vector.len() as u64) as usize;
    let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
    vector[bucket] += sign * weight;
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    async fn embed_texts(&self, texts: &[String], task: TaskType) -> Result<EmbeddingResult> {
        tracing::debug!("Hashing {} texts as {}", texts.len(), task);
        let embeddings = texts.iter().map(|t| self.embed_sync(t)).collect();
        Ok(EmbeddingResult::new(embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.config.dimension
    }

    fn provider_name(&self) -> &str {
        "hashing"
    }
}
