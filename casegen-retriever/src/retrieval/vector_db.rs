//! Process-wide registry of collections
//!
//! Each collection sits behind its own `RwLock`, so writes to one collection
//! are serialized while reads and writes on other collections proceed
//! independently. The registry lock is only held long enough to look up or
//! create a collection handle.

use super::{RetrievalRequest, ScoredChunk};
use crate::error::{Result, RetrieverError};
use crate::storage::collection::CollectionStats;
use crate::storage::{Chunk, ChunkId, Collection, CommitOutcome, DistanceMetric, Handle, WriteBatch};
use casegen_embed::Embedding;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type SharedCollection = Arc<RwLock<Collection>>;

/// Named, lazily created collections sharing one distance metric.
#[derive(Debug, Default)]
pub struct VectorDb {
    metric: DistanceMetric,
    collections: RwLock<HashMap<String, SharedCollection>>,
}

impl VectorDb {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            collections: RwLock::new(HashMap::new()),
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn existing(&self, name: &str) -> Option<SharedCollection> {
        self.collections.read().await.get(name).cloned()
    }

    async fn get_or_create(&self, name: &str) -> SharedCollection {
        if let Some(collection) = self.existing(name).await {
            return collection;
        }
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating collection '{}'", name);
                Arc::new(RwLock::new(Collection::new(name, self.metric)))
            })
            .clone()
    }

    /// Append vectors under caller-chosen handles.
    pub async fn add_vectors(
        &self,
        collection: &str,
        handles: &[Handle],
        vectors: &[Embedding],
    ) -> Result<()> {
        let shared = self.get_or_create(collection).await;
        let mut guard = shared.write().await;
        guard.add_vectors(handles, vectors)
    }

    /// Up to `k` nearest live vectors. A missing collection yields nothing.
    pub async fn search(&self, collection: &str, query: &[f32], k: usize) -> Result<Vec<(Handle, f32)>> {
        match self.existing(collection).await {
            Some(shared) => shared.read().await.index().search(query, k),
            None => Ok(Vec::new()),
        }
    }

    pub async fn bind(&self, collection: &str, handle: Handle, chunk_id: &str) -> Result<()> {
        let shared = self.get_or_create(collection).await;
        let mut guard = shared.write().await;
        guard.bind(handle, chunk_id)
    }

    pub async fn resolve(&self, collection: &str, handle: Handle) -> Result<ChunkId> {
        let shared = self
            .existing(collection)
            .await
            .ok_or_else(|| RetrieverError::UnknownHandle {
                collection: collection.to_string(),
                handle,
            })?;
        let guard = shared.read().await;
        guard.identifiers().resolve(handle).cloned()
    }

    /// Upsert a chunk, returning the one it replaced.
    pub async fn put_chunk(&self, collection: &str, chunk: Chunk) -> Option<Chunk> {
        let shared = self.get_or_create(collection).await;
        let mut guard = shared.write().await;
        guard.put_chunk(chunk)
    }

    pub async fn get_chunk(&self, collection: &str, chunk_id: &str) -> Result<Chunk> {
        let shared = self
            .existing(collection)
            .await
            .ok_or_else(|| RetrieverError::ChunkNotFound {
                collection: collection.to_string(),
                chunk_id: chunk_id.to_string(),
            })?;
        let guard = shared.read().await;
        guard.chunks().get(chunk_id).cloned()
    }

    /// Atomically apply a write batch, creating the collection if needed.
    pub async fn commit(&self, collection: &str, batch: WriteBatch) -> Result<CommitOutcome> {
        let shared = self.get_or_create(collection).await;
        let mut guard = shared.write().await;
        guard.commit(batch)
    }

    /// Texts of the chunks matching `request`, nearest first.
    pub async fn retrieve(
        &self,
        query_embedding: &[f32],
        collection: &str,
        request: &RetrievalRequest,
    ) -> Result<Vec<String>> {
        let scored = self
            .retrieve_scored(query_embedding, collection, request)
            .await?;
        Ok(scored.into_iter().map(|c| c.text).collect())
    }

    /// Like [`retrieve`](Self::retrieve) but keeps ids, metadata and distances.
    pub async fn retrieve_scored(
        &self,
        query_embedding: &[f32],
        collection: &str,
        request: &RetrievalRequest,
    ) -> Result<Vec<ScoredChunk>> {
        let Some(shared) = self.existing(collection).await else {
            debug!("Collection '{}' has not been ingested yet", collection);
            return Ok(Vec::new());
        };
        let guard = shared.read().await;
        guard.retrieve(query_embedding, request)
    }

    pub async fn stats(&self, collection: &str) -> Option<CollectionStats> {
        let shared = self.existing(collection).await?;
        let guard = shared.read().await;
        Some(guard.stats())
    }

    /// Stats for every collection, sorted by name.
    pub async fn all_stats(&self) -> Vec<CollectionStats> {
        let mut stats = Vec::new();
        for name in self.collection_names().await {
            if let Some(s) = self.stats(&name).await {
                stats.push(s);
            }
        }
        stats
    }

    pub async fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MetadataFilter, user_metadata};

    #[tokio::test]
    async fn test_missing_collection_reads() {
        let db = VectorDb::default();

        assert!(db.search("nothing", &[0.0], 5).await.unwrap().is_empty());
        let request = RetrievalRequest::default();
        assert!(db.retrieve(&[0.0], "nothing", &request).await.unwrap().is_empty());
        assert!(db.stats("nothing").await.is_none());
        assert!(matches!(
            db.resolve("nothing", 0).await,
            Err(RetrieverError::UnknownHandle { .. })
        ));
        assert!(matches!(
            db.get_chunk("nothing", "c").await,
            Err(RetrieverError::ChunkNotFound { .. })
        ));
        assert!(db.collection_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_low_level_round_trip() {
        let db = VectorDb::default();
        db.add_vectors("spec", &[0], &[vec![0.3, 0.4]]).await.unwrap();
        db.bind("spec", 0, "c0").await.unwrap();
        db.put_chunk("spec", Chunk::new("c0", "hello", user_metadata("A")))
            .await;

        assert_eq!(db.resolve("spec", 0).await.unwrap(), "c0");
        assert_eq!(db.get_chunk("spec", "c0").await.unwrap().text, "hello");

        let request = RetrievalRequest::new(MetadataFilter::for_user("A"), 0.0);
        assert_eq!(
            db.retrieve(&[0.3, 0.4], "spec", &request).await.unwrap(),
            vec!["hello"]
        );
    }

    #[tokio::test]
    async fn test_commit_does_not_reuse_low_level_handles() {
        let db = VectorDb::default();
        db.add_vectors("spec", &[0], &[vec![0.0, 0.0]]).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.push(
            Chunk::new("far", "far away text", user_metadata("A")),
            vec![10.0, 10.0],
        );
        let outcome = db.commit("spec", batch).await.unwrap();
        assert_eq!(outcome.handles, vec![1]);

        let stats = db.stats("spec").await.unwrap();
        assert_eq!(stats.vectors, 2);
        assert_eq!(stats.handles_issued, 2);

        let request = RetrievalRequest::new(MetadataFilter::for_user("A"), 0.7);
        assert!(
            db.retrieve_scored(&[0.0, 0.0], "spec", &request)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let db = VectorDb::default();
        db.add_vectors("specification", &[0], &[vec![1.0, 2.0]])
            .await
            .unwrap();
        // Different width is fine in another collection
        db.add_vectors("test_cases", &[0], &[vec![1.0, 2.0, 3.0]])
            .await
            .unwrap();

        assert_eq!(db.stats("specification").await.unwrap().dimension, Some(2));
        assert_eq!(db.stats("test_cases").await.unwrap().dimension, Some(3));
        assert_eq!(
            db.collection_names().await,
            vec!["specification", "test_cases"]
        );
        assert_eq!(db.all_stats().await.len(), 2);
    }
}
