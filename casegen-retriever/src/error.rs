//! Error types for the retrieval core

use crate::storage::{ChunkId, Handle};
use casegen_embed::EmbedError;

/// Result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrieverError>;

/// Errors raised by the vector index, identifier map, chunk store and the
/// pipelines built on top of them.
///
/// `DuplicateHandle`, `UnknownHandle` and `ChunkNotFound` signal broken
/// bookkeeping between the three per-collection structures and are logged
/// at error level where they surface. Threshold and metadata exclusions are
/// not errors, and neither is reading a collection that was never written.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// Embedding width differs from the width established for the collection
    #[error("Dimension mismatch in collection '{collection}': expected {expected}, got {found}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        found: usize,
    },

    /// A zero-width embedding was supplied
    #[error("Embeddings must have at least one dimension")]
    EmptyEmbedding,

    /// Handles and vectors (or chunks and vectors) do not pair up
    #[error("Length mismatch: {left} handles for {right} vectors")]
    LengthMismatch { left: usize, right: usize },

    /// The handle is already bound to a chunk id or already names a stored vector
    #[error("Handle {handle} is already in use in collection '{collection}'")]
    DuplicateHandle { collection: String, handle: Handle },

    /// The handle has no binding, or the collection does not exist
    #[error("Unknown handle {handle} in collection '{collection}'")]
    UnknownHandle { collection: String, handle: Handle },

    /// No chunk stored under this id
    #[error("Chunk '{chunk_id}' not found in collection '{collection}'")]
    ChunkNotFound {
        collection: String,
        chunk_id: ChunkId,
    },

    /// Failure reported by the embedding provider
    #[error(transparent)]
    Embed(#[from] EmbedError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetrieverError {
    /// Whether the error indicates broken internal bookkeeping rather than bad input.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateHandle { .. } | Self::UnknownHandle { .. } | Self::ChunkNotFound { .. }
        )
    }
}
