//! Document ingestion: split, embed, identify and commit as one batch.

use super::VectorDb;
use crate::config::IngestionConfig;
use crate::error::Result;
use crate::storage::{Chunk, ChunkId, Handle, MetadataFilter, WriteBatch, user_metadata};
use casegen_context::ChunkingPolicy;
use casegen_embed::{EmbedError, EmbeddingProvider, TaskType};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Deterministic chunk id for the chunk at `index` of a user's document.
pub fn chunk_id_for(user_id: &str, collection: &str, index: usize) -> ChunkId {
    format!("{user_id}_{collection}_f{index}")
}

/// Summary of one ingestion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub user_id: String,
    pub collection: String,
    /// Ids written, in chunk order
    pub chunk_ids: Vec<ChunkId>,
    pub handles: Vec<Handle>,
    /// Vectors from earlier ingestions hidden from search
    pub retired: usize,
    /// Chunk ids from earlier ingestions that no longer exist
    pub removed: Vec<ChunkId>,
    /// The splitter found nothing and the whole document was stored
    pub used_fallback: bool,
    /// Hex blake3 digest of the raw document
    pub fingerprint: String,
}

impl IngestReport {
    fn empty(user_id: &str, collection: &str, fingerprint: String) -> Self {
        Self {
            user_id: user_id.to_string(),
            collection: collection.to_string(),
            chunk_ids: Vec::new(),
            handles: Vec::new(),
            retired: 0,
            removed: Vec::new(),
            used_fallback: false,
            fingerprint,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_ids.len()
    }
}

/// Write path from raw document text to stored, searchable chunks.
pub struct IngestionPipeline {
    db: Arc<VectorDb>,
    provider: Arc<dyn EmbeddingProvider>,
    policy: Arc<dyn ChunkingPolicy>,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(
        db: Arc<VectorDb>,
        provider: Arc<dyn EmbeddingProvider>,
        policy: Arc<dyn ChunkingPolicy>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            db,
            provider,
            policy,
            config,
        }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    /// Ingest `document` for `user_id` into `collection`.
    ///
    /// Every chunk carries `{"user_id": user_id}` metadata. A blank document
    /// writes nothing. Provider failures propagate and leave the collection
    /// untouched.
    pub async fn ingest(&self, user_id: &str, collection: &str, document: &str) -> Result<IngestReport> {
        let started = Instant::now();
        let fingerprint = hex::encode(blake3::hash(document.as_bytes()).as_bytes());
        let mut report = IngestReport::empty(user_id, collection, fingerprint);

        if document.trim().is_empty() {
            info!(
                "Skipping blank document for user {} in '{}'",
                user_id, collection
            );
            return Ok(report);
        }

        let mut texts: Vec<String> = self
            .policy
            .split(document)
            .into_iter()
            .map(|chunk| chunk.text)
            .collect();

        if texts.is_empty() {
            if !self.config.fallback_whole_document {
                warn!(
                    "{} policy found no chunks for user {} in '{}', nothing stored",
                    self.policy.name(),
                    user_id,
                    collection
                );
                return Ok(report);
            }
            warn!(
                "{} policy found no chunks for user {} in '{}', storing whole document",
                self.policy.name(),
                user_id,
                collection
            );
            texts.push(document.trim().to_string());
            report.used_fallback = true;
        }

        debug!("Embedding {} chunks for '{}'", texts.len(), collection);
        let result = self
            .provider
            .embed_texts(&texts, TaskType::RetrievalDocument)
            .await?;
        if result.len() != texts.len() {
            return Err(EmbedError::UnexpectedResponse {
                expected: texts.len(),
                found: result.len(),
            }
            .into());
        }

        let metadata = user_metadata(user_id);
        let mut batch = WriteBatch::new();
        for (index, (text, vector)) in texts.into_iter().zip(result.embeddings).enumerate() {
            let chunk_id = chunk_id_for(user_id, collection, index);
            report.chunk_ids.push(chunk_id.clone());
            batch.push(Chunk::new(chunk_id, text, metadata.clone()), vector);
        }
        if self.config.purge_stale {
            batch = batch.replacing(MetadataFilter::for_user(user_id));
        }

        let outcome = self.db.commit(collection, batch).await?;
        report.handles = outcome.handles;
        report.retired = outcome.retired;
        report.removed = outcome.removed;

        info!(
            "Ingested {} chunks for user {} into '{}' ({} retired) in {:?}",
            report.chunk_count(),
            user_id,
            collection,
            report.retired,
            started.elapsed()
        );
        Ok(report)
    }
}
