//! Tenant-scoped semantic search over one collection.

use super::{RetrievalRequest, ScoredChunk, VectorDb};
use crate::config::RetrievalConfig;
use crate::error::Result;
use casegen_embed::{EmbeddingProvider, TaskType};
use std::sync::Arc;
use tracing::debug;

/// Public read path: embed a query and return the stored text closest to it.
pub struct RetrievalEngine {
    db: Arc<VectorDb>,
    provider: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(
        db: Arc<VectorDb>,
        provider: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            db,
            provider,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// The request `find_similar` issues for `user_id`.
    pub fn request_for(&self, user_id: &str) -> RetrievalRequest {
        RetrievalRequest {
            max_results: self.config.max_results,
            ..RetrievalRequest::for_user(user_id).with_threshold(self.config.distance_threshold)
        }
    }

    /// Texts relevant to `query` among `user_id`'s chunks, nearest first.
    pub async fn find_similar(&self, query: &str, collection: &str, user_id: &str) -> Result<Vec<String>> {
        let scored = self.find_similar_scored(query, collection, user_id).await?;
        Ok(scored.into_iter().map(|c| c.text).collect())
    }

    pub async fn find_similar_scored(
        &self,
        query: &str,
        collection: &str,
        user_id: &str,
    ) -> Result<Vec<ScoredChunk>> {
        // Nothing to compare against, so skip the provider call
        if self.db.stats(collection).await.is_none() {
            debug!("No collection '{}' to search", collection);
            return Ok(Vec::new());
        }

        let embedding = self
            .provider
            .embed_text(query, TaskType::RetrievalQuery)
            .await?;
        let results = self
            .db
            .retrieve_scored(&embedding, collection, &self.request_for(user_id))
            .await?;

        debug!(
            "Query in '{}' for user {} matched {} chunks",
            collection,
            user_id,
            results.len()
        );
        Ok(results)
    }
}
