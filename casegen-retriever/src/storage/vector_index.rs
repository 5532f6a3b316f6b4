//! Flat exhaustive vector index
//!
//! Vectors are kept in one contiguous `f32` buffer in insertion order. Search
//! computes the distance to every live vector, which is fine for the corpus
//! sizes this crate targets (one user's documents, not web scale).

use super::Handle;
use crate::error::{Result, RetrieverError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Distance used to rank stored vectors against a query.
///
/// Both metrics order vectors identically; they differ only in the number
/// compared against the distance threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Sum of squared component differences
    #[default]
    SquaredL2,
    /// Euclidean distance
    L2,
}

impl DistanceMetric {
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        let squared: f32 = a
            .iter()
            .zip(b)
            .map(|(x, y)| {
                let d = x - y;
                d * d
            })
            .sum();
        match self {
            Self::SquaredL2 => squared,
            Self::L2 => squared.sqrt(),
        }
    }
}

/// Exhaustive nearest-neighbour index for one collection.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    collection: String,
    metric: DistanceMetric,
    dimension: Option<usize>,
    handles: Vec<Handle>,
    stored: HashSet<Handle>,
    data: Vec<f32>,
    retired: HashSet<Handle>,
}

impl VectorIndex {
    pub fn new(collection: impl Into<String>, metric: DistanceMetric) -> Self {
        Self {
            collection: collection.into(),
            metric,
            dimension: None,
            handles: Vec::new(),
            stored: HashSet::new(),
            data: Vec::new(),
            retired: HashSet::new(),
        }
    }

    /// Width fixed by the first insert, `None` while empty.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of stored vectors, including retired ones.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of vectors still visible to search.
    pub fn live_len(&self) -> usize {
        self.handles.len() - self.retired.len()
    }

    /// Check that `vectors` could be added without touching the index.
    pub fn validate(&self, vectors: &[Vec<f32>]) -> Result<()> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };
        let expected = self.dimension.unwrap_or(first.len());
        if expected == 0 {
            return Err(RetrieverError::EmptyEmbedding);
        }

        match vectors.iter().find(|v| v.len() != expected) {
            Some(bad) => Err(self.dimension_mismatch(expected, bad.len())),
            None => Ok(()),
        }
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.stored.contains(&handle)
    }

    /// Append `vectors`, pairing each with the handle at the same position.
    ///
    /// The whole call is rejected before any mutation if the lengths differ,
    /// any vector has the wrong width, or a handle is already stored or
    /// repeated within the call.
    pub fn add(&mut self, handles: &[Handle], vectors: &[Vec<f32>]) -> Result<()> {
        if handles.len() != vectors.len() {
            return Err(RetrieverError::LengthMismatch {
                left: handles.len(),
                right: vectors.len(),
            });
        }
        self.validate(vectors)?;

        let mut incoming = HashSet::with_capacity(handles.len());
        if let Some(handle) = handles
            .iter()
            .find(|h| self.stored.contains(*h) || !incoming.insert(**h))
        {
            return Err(RetrieverError::DuplicateHandle {
                collection: self.collection.clone(),
                handle: *handle,
            });
        }

        if let Some(first) = vectors.first() {
            self.dimension.get_or_insert(first.len());
        }
        self.data.reserve(vectors.iter().map(Vec::len).sum());
        for (handle, vector) in handles.iter().zip(vectors) {
            self.handles.push(*handle);
            self.stored.insert(*handle);
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Up to `k` live vectors nearest to `query`, by ascending distance.
    ///
    /// Equal distances are ordered by handle. An empty index returns an empty
    /// result for any query.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Handle, f32)>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(self.dimension_mismatch(dimension, query.len()));
        }

        let mut scored: Vec<(Handle, f32)> = self
            .handles
            .iter()
            .zip(self.data.chunks_exact(dimension))
            .filter(|(handle, _)| !self.retired.contains(handle))
            .map(|(handle, vector)| (*handle, self.metric.distance(query, vector)))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    /// Hide `handles` from search. Stored vectors are kept and still counted
    /// by [`len`](Self::len). Returns how many handles were newly retired.
    pub fn retire(&mut self, handles: &[Handle]) -> usize {
        handles
            .iter()
            .filter(|h| self.stored.contains(*h))
            .filter(|h| self.retired.insert(**h))
            .count()
    }

    fn dimension_mismatch(&self, expected: usize, found: usize) -> RetrieverError {
        RetrieverError::DimensionMismatch {
            collection: self.collection.clone(),
            expected,
            found,
        }
    }
}
