//! Chunking policies that turn a raw document into retrievable passages.
//!
//! A [`ChunkingPolicy`] is a pure function from document text to an ordered
//! list of [`TextChunk`]s. Two policies are provided:
//!
//! - [`FeatureBlockSplitter`] cuts requirement documents at `Feature <n>:`
//!   headers, one chunk per feature.
//! - [`RecursiveSplitter`] cuts arbitrary prose at paragraph, line and word
//!   boundaries so that no chunk exceeds a length bound.
//!
//! ```
//! use casegen_context::{ChunkingKind, policy_for};
//!
//! let policy = policy_for(ChunkingKind::FeatureBlocks, 2000).unwrap();
//! let chunks = policy.split("Feature 1: Login\nUsers sign in.\nFeature 2: Logout\n");
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[0].text, "Feature 1: Login\nUsers sign in.");
//! ```

pub mod feature;
pub mod text;

use serde::{Deserialize, Serialize};

pub use feature::FeatureBlockSplitter;
pub use text::{DEFAULT_DELIMITERS, RecursiveSplitter};

/// Default upper bound on chunk length for [`RecursiveSplitter`], in bytes.
pub const DEFAULT_MAX_CHUNK_LENGTH: usize = 2000;

/// A single passage cut from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Position of this chunk within the document (0-indexed).
    pub sequence: usize,
    /// The passage text.
    pub text: String,
}

/// Splits a document into chunks. Implementations must be deterministic.
pub trait ChunkingPolicy: Send + Sync {
    fn split(&self, document: &str) -> Vec<TextChunk>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Selects one of the built-in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingKind {
    /// One chunk per `Feature <n>:` block
    #[default]
    FeatureBlocks,
    /// Length-bounded recursive splitting
    Recursive,
}

/// Build the policy for `kind`. `max_chunk_length` only applies to the recursive splitter.
pub fn policy_for(
    kind: ChunkingKind,
    max_chunk_length: usize,
) -> Result<Box<dyn ChunkingPolicy>, regex::Error> {
    Ok(match kind {
        ChunkingKind::FeatureBlocks => Box::new(FeatureBlockSplitter::new()?),
        ChunkingKind::Recursive => Box::new(RecursiveSplitter::with_defaults(max_chunk_length)?),
    })
}
