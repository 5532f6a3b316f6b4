//! In-memory storage for one collection
//!
//! Each collection owns three structures that are only ever mutated together:
//!
//! ```text
//! VectorIndex (handle -> vector) ─┐
//! IdentifierMap (handle <-> id) ──┼── Collection ── WriteBatch commit
//! ChunkStore (id -> text, meta) ──┘
//! ```
//!
//! Nothing here is persisted; process lifetime is data lifetime.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod chunk_store;
pub mod collection;
pub mod identifier_map;
pub mod vector_index;

pub use chunk_store::ChunkStore;
pub use collection::{Collection, CommitOutcome, WriteBatch};
pub use identifier_map::IdentifierMap;
pub use vector_index::{DistanceMetric, VectorIndex};

/// Dense per-collection integer assigned to each stored vector.
pub type Handle = u64;

/// Caller-supplied durable chunk identifier, unique within a collection.
pub type ChunkId = String;

/// Opaque key/value data used only for equality filtering.
pub type Metadata = BTreeMap<String, String>;

/// Metadata key that scopes a chunk to one user.
pub const USER_ID_KEY: &str = "user_id";

/// A stored unit of retrievable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(id: impl Into<ChunkId>, text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
        }
    }
}

/// Exact-match conjunctive filter over chunk metadata.
///
/// Every key in the filter must be present in the chunk's metadata with an
/// equal value. A missing key fails the filter. The empty filter matches
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(BTreeMap<String, String>);

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter that restricts results to chunks owned by `user_id`.
    pub fn for_user(user_id: &str) -> Self {
        Self::new().with(USER_ID_KEY, user_id)
    }

    /// Add a required key/value pair (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.0
            .iter()
            .all(|(key, value)| metadata.get(key) == Some(value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl From<Metadata> for MetadataFilter {
    fn from(map: Metadata) -> Self {
        Self(map)
    }
}

/// Metadata identifying `user_id` as the owner of a chunk.
pub fn user_metadata(user_id: &str) -> Metadata {
    Metadata::from([(USER_ID_KEY.to_string(), user_id.to_string())])
}
