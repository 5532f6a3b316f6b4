//! Chunk text and metadata keyed by chunk id

use super::{Chunk, ChunkId, MetadataFilter};
use crate::error::{Result, RetrieverError};
use std::collections::HashMap;

/// Source of truth for retrieval results within one collection.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    collection: String,
    chunks: HashMap<ChunkId, Chunk>,
}

impl ChunkStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            chunks: HashMap::new(),
        }
    }

    /// Insert or replace the chunk stored under `chunk.id`. Returns the replaced chunk.
    pub fn put(&mut self, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(chunk.id.clone(), chunk)
    }

    pub fn get(&self, chunk_id: &str) -> Result<&Chunk> {
        self.chunks
            .get(chunk_id)
            .ok_or_else(|| RetrieverError::ChunkNotFound {
                collection: self.collection.clone(),
                chunk_id: chunk_id.to_string(),
            })
    }

    pub fn contains(&self, chunk_id: &str) -> bool {
        self.chunks.contains_key(chunk_id)
    }

    pub fn remove(&mut self, chunk_id: &str) -> Option<Chunk> {
        self.chunks.remove(chunk_id)
    }

    /// Ids of all chunks whose metadata passes `filter`, sorted.
    pub fn ids_matching(&self, filter: &MetadataFilter) -> Vec<ChunkId> {
        let mut ids: Vec<ChunkId> = self
            .chunks
            .values()
            .filter(|chunk| filter.matches(&chunk.metadata))
            .map(|chunk| chunk.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
