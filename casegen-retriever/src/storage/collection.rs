//! One named collection: vector index, identifier map and chunk store

use super::{
    Chunk, ChunkId, ChunkStore, DistanceMetric, Handle, IdentifierMap, MetadataFilter, VectorIndex,
};
use crate::error::{Result, RetrieverError};
use crate::retrieval::{RetrievalRequest, ScoredChunk};
use casegen_embed::Embedding;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{error, warn};

/// Chunks and their vectors, written to a collection as one unit.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    chunks: Vec<Chunk>,
    vectors: Vec<Embedding>,
    replace_owner: Option<MetadataFilter>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Chunk, vector: Embedding) {
        self.chunks.push(chunk);
        self.vectors.push(vector);
    }

    /// Supersede everything currently stored whose metadata matches `owner`.
    ///
    /// On commit, the vectors of matching chunks are retired and matching
    /// chunks whose ids are not rewritten by this batch are dropped.
    pub fn replacing(mut self, owner: MetadataFilter) -> Self {
        self.replace_owner = Some(owner);
        self
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// What a committed batch changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitOutcome {
    /// Handles issued to the new vectors, in batch order
    pub handles: Vec<Handle>,
    /// Previously live vectors hidden from search
    pub retired: usize,
    /// Chunk ids dropped from the store
    pub removed: Vec<ChunkId>,
}

/// Point-in-time counters for a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub name: String,
    pub dimension: Option<usize>,
    pub vectors: usize,
    pub live_vectors: usize,
    pub handles_issued: Handle,
    pub chunks: usize,
}

#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    index: VectorIndex,
    ids: IdentifierMap,
    chunks: ChunkStore,
}

impl Collection {
    pub fn new(name: impl Into<String>, metric: DistanceMetric) -> Self {
        let name = name.into();
        Self {
            index: VectorIndex::new(name.clone(), metric),
            ids: IdentifierMap::new(name.clone()),
            chunks: ChunkStore::new(name.clone()),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn identifiers(&self) -> &IdentifierMap {
        &self.ids
    }

    pub fn chunks(&self) -> &ChunkStore {
        &self.chunks
    }

    /// Store vectors under caller-chosen handles. Those handles count as
    /// issued, so later commits allocate past them.
    pub fn add_vectors(&mut self, handles: &[Handle], vectors: &[Embedding]) -> Result<()> {
        self.index.add(handles, vectors)?;
        for handle in handles {
            self.ids.reserve(*handle);
        }
        Ok(())
    }

    pub fn bind(&mut self, handle: Handle, chunk_id: impl Into<ChunkId>) -> Result<()> {
        self.ids.bind(handle, chunk_id)
    }

    pub fn put_chunk(&mut self, chunk: Chunk) -> Option<Chunk> {
        self.chunks.put(chunk)
    }

    /// Apply `batch` so that either all of it lands or nothing changes.
    ///
    /// Every check that can fail runs before the first mutation.
    pub fn commit(&mut self, batch: WriteBatch) -> Result<CommitOutcome> {
        if batch.chunks.len() != batch.vectors.len() {
            return Err(RetrieverError::LengthMismatch {
                left: batch.chunks.len(),
                right: batch.vectors.len(),
            });
        }
        self.index.validate(&batch.vectors)?;

        let mut outcome = CommitOutcome::default();
        if let Some(owner) = &batch.replace_owner {
            let incoming: HashSet<&str> = batch.chunks.iter().map(|c| c.id.as_str()).collect();
            for chunk_id in self.chunks.ids_matching(owner) {
                outcome.retired += self.index.retire(self.ids.handles_for(&chunk_id));
                if !incoming.contains(chunk_id.as_str()) {
                    self.chunks.remove(&chunk_id);
                    outcome.removed.push(chunk_id);
                }
            }
        }

        let handles: Vec<Handle> = self.ids.allocate(batch.len()).collect();
        self.index.add(&handles, &batch.vectors)?;
        for (handle, chunk) in handles.iter().zip(batch.chunks) {
            self.ids.bind(*handle, chunk.id.clone())?;
            self.chunks.put(chunk);
        }

        outcome.handles = handles;
        Ok(outcome)
    }

    /// Ranked, deduplicated, threshold- and metadata-filtered chunks for `query`.
    ///
    /// Candidates are walked in ascending distance. The first time a chunk id
    /// is seen decides whether it is emitted; later handles for the same id
    /// are skipped regardless of their distance.
    pub fn retrieve(&self, query: &[f32], request: &RetrievalRequest) -> Result<Vec<ScoredChunk>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.index.search(query, self.index.len())?;
        let mut seen: HashSet<&str> = HashSet::new();
        let mut results = Vec::new();

        for (handle, distance) in candidates {
            if request.max_results.is_some_and(|max| results.len() >= max) {
                break;
            }

            let Some(chunk_id) = self.ids.get(handle) else {
                warn!(
                    "Skipping unbound handle {} in collection '{}'",
                    handle, self.name
                );
                continue;
            };
            if !seen.insert(chunk_id.as_str()) {
                continue;
            }

            let chunk = self.chunks.get(chunk_id).inspect_err(|e| {
                error!("Identifier map and chunk store out of sync: {}", e);
            })?;

            let within_threshold = distance <= request.distance_threshold;
            if !within_threshold || !request.metadata_filter.matches(&chunk.metadata) {
                continue;
            }

            results.push(ScoredChunk {
                chunk_id: chunk.id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                handle,
                distance,
            });
        }

        Ok(results)
    }

    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            name: self.name.clone(),
            dimension: self.index.dimension(),
            vectors: self.index.len(),
            live_vectors: self.index.live_len(),
            handles_issued: self.ids.issued(),
            chunks: self.chunks.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::user_metadata;

    fn owned_batch(user: &str, texts: &[&str], vectors: &[Vec<f32>]) -> WriteBatch {
        let mut batch = WriteBatch::new();
        for (i, (text, vector)) in texts.iter().zip(vectors).enumerate() {
            batch.push(
                Chunk::new(format!("{user}_spec_f{i}"), *text, user_metadata(user)),
                vector.clone(),
            );
        }
        batch
    }

    fn texts(results: &[ScoredChunk]) -> Vec<&str> {
        results.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn test_commit_writes_all_three_structures() {
        let mut collection = Collection::new("spec", DistanceMetric::SquaredL2);
        let outcome = collection
            .commit(owned_batch("A", &["one", "two"], &[vec![0.0, 0.0], vec![1.0, 0.0]]))
            .unwrap();

        assert_eq!(outcome.handles, vec![0, 1]);
        assert_eq!(collection.identifiers().resolve(1).unwrap(), "A_spec_f1");
        assert_eq!(collection.chunks().get("A_spec_f1").unwrap().text, "two");
        assert_eq!(collection.index().len(), 2);
    }

    #[test]
    fn test_rejected_commit_changes_nothing() {
        let mut collection = Collection::new("spec", DistanceMetric::SquaredL2);
        collection
            .commit(owned_batch("A", &["one"], &[vec![0.0, 0.0]]))
            .unwrap();
        let before = collection.stats();

        let err = collection
            .commit(
                owned_batch("A", &["x", "y"], &[vec![0.0, 0.0], vec![0.0, 0.0, 0.0]])
                    .replacing(MetadataFilter::for_user("A")),
            )
            .unwrap_err();

        assert!(matches!(err, RetrieverError::DimensionMismatch { .. }));
        assert_eq!(collection.stats(), before);
        assert_eq!(collection.chunks().get("A_spec_f0").unwrap().text, "one");
    }

    #[test]
    fn test_replacing_retires_and_drops_stale_chunks() {
        let mut collection = Collection::new("spec", DistanceMetric::SquaredL2);
        collection
            .commit(owned_batch(
                "A",
                &["a0", "a1", "a2"],
                &[vec![0.0], vec![1.0], vec![2.0]],
            ))
            .unwrap();
        collection
            .commit(owned_batch("B", &["b0"], &[vec![0.5]]))
            .unwrap();

        let outcome = collection
            .commit(
                owned_batch("A", &["new a0"], &[vec![0.0]])
                    .replacing(MetadataFilter::for_user("A")),
            )
            .unwrap();

        assert_eq!(outcome.retired, 3);
        assert_eq!(outcome.removed, vec!["A_spec_f1", "A_spec_f2"]);
        let stats = collection.stats();
        assert_eq!(stats.vectors, 5);
        assert_eq!(stats.live_vectors, 2);
        assert_eq!(stats.chunks, 2);

        let request = RetrievalRequest::new(MetadataFilter::new(), 100.0);
        let results = collection.retrieve(&[0.0], &request).unwrap();
        assert_eq!(texts(&results), vec!["new a0", "b0"]);
    }

    #[test]
    fn test_retrieve_first_occurrence_decides() {
        let mut collection = Collection::new("spec", DistanceMetric::SquaredL2);
        collection.put_chunk(Chunk::new("c", "shared", user_metadata("A")));
        collection.add_vectors(&[0, 1], &[vec![0.0], vec![0.1]]).unwrap();
        collection.bind(0, "c").unwrap();
        collection.bind(1, "c").unwrap();

        let request = RetrievalRequest::new(MetadataFilter::for_user("A"), 1.0);
        let results = collection.retrieve(&[0.0], &request).unwrap();
        assert_eq!(texts(&results), vec!["shared"]);
        assert_eq!(results[0].handle, 0);
    }

    #[test]
    fn test_retrieve_skips_unbound_handles() {
        let mut collection = Collection::new("spec", DistanceMetric::SquaredL2);
        collection.put_chunk(Chunk::new("c", "bound", user_metadata("A")));
        collection.add_vectors(&[0, 1], &[vec![0.0], vec![0.5]]).unwrap();
        collection.bind(1, "c").unwrap();

        let request = RetrievalRequest::new(MetadataFilter::new(), 1.0);
        let results = collection.retrieve(&[0.0], &request).unwrap();
        assert_eq!(texts(&results), vec!["bound"]);
    }

    #[test]
    fn test_retrieve_reports_missing_chunk() {
        let mut collection = Collection::new("spec", DistanceMetric::SquaredL2);
        collection.add_vectors(&[0], &[vec![0.0]]).unwrap();
        collection.bind(0, "ghost").unwrap();

        let request = RetrievalRequest::new(MetadataFilter::new(), 1.0);
        let err = collection.retrieve(&[0.0], &request).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_commit_after_external_vectors_issues_fresh_handles() {
        let mut collection = Collection::new("spec", DistanceMetric::SquaredL2);
        collection.add_vectors(&[0], &[vec![0.0, 0.0]]).unwrap();

        let mut batch = WriteBatch::new();
        batch.push(
            Chunk::new("far", "far away text", user_metadata("A")),
            vec![10.0, 10.0],
        );
        let outcome = collection.commit(batch).unwrap();

        assert_eq!(outcome.handles, vec![1]);
        assert!(collection.identifiers().get(0).is_none());
        assert_eq!(collection.identifiers().resolve(1).unwrap(), "far");
        let stats = collection.stats();
        assert_eq!(stats.vectors, 2);
        assert_eq!(stats.handles_issued, 2);

        let request = RetrievalRequest::new(MetadataFilter::for_user("A"), 0.7);
        assert!(collection.retrieve(&[0.0, 0.0], &request).unwrap().is_empty());

        let request = RetrievalRequest::new(MetadataFilter::for_user("A"), 1000.0);
        let results = collection.retrieve(&[0.0, 0.0], &request).unwrap();
        assert_eq!(texts(&results), vec!["far away text"]);
        assert_eq!(results[0].distance, 200.0);
    }

    #[test]
    fn test_handles_stay_distinct_across_write_paths() {
        let mut collection = Collection::new("spec", DistanceMetric::SquaredL2);
        collection
            .commit(owned_batch("A", &["a0", "a1"], &[vec![0.0], vec![1.0]]))
            .unwrap();
        collection.add_vectors(&[5], &[vec![2.0]]).unwrap();
        collection.bind(5, "A_spec_f0").unwrap();
        let outcome = collection
            .commit(owned_batch("B", &["b0", "b1"], &[vec![3.0], vec![4.0]]))
            .unwrap();

        assert_eq!(outcome.handles, vec![6, 7]);
        assert!(matches!(
            collection.add_vectors(&[7], &[vec![9.0]]),
            Err(RetrieverError::DuplicateHandle { handle: 7, .. })
        ));

        let handles: HashSet<Handle> = collection
            .index()
            .search(&[0.0], collection.index().len())
            .unwrap()
            .into_iter()
            .map(|(handle, _)| handle)
            .collect();
        assert_eq!(handles.len(), collection.index().len());
        assert_eq!(handles, HashSet::from([0, 1, 5, 6, 7]));
        assert_eq!(collection.identifiers().len(), 5);
    }

    #[test]
    fn test_max_results_caps_output() {
        let mut collection = Collection::new("spec", DistanceMetric::SquaredL2);
        collection
            .commit(owned_batch(
                "A",
                &["near", "mid", "far"],
                &[vec![0.0], vec![0.1], vec![0.2]],
            ))
            .unwrap();

        let request = RetrievalRequest::new(MetadataFilter::new(), 1.0).with_max_results(2);
        let results = collection.retrieve(&[0.0], &request).unwrap();
        assert_eq!(texts(&results), vec!["near", "mid"]);
    }
}
