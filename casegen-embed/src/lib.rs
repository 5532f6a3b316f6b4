//! # casegen-embed
//!
//! Text embedding providers for the casegen retrieval core. All providers sit
//! behind the async [`EmbeddingProvider`] trait, and every call says whether
//! the text is a stored document or a search query ([`TaskType`]).
//!
//! ## Providers
//!
//! - [`HashingProvider`]: deterministic FNV feature hashing. Offline, used by
//!   default and in tests.
//! - [`GeminiProvider`]: Gemini `embedding-001` over HTTPS, batched through
//!   `batchEmbedContents`.
//! - `FastEmbedProvider`: local ONNX models, behind the `fastembed` feature.
//!
//! ## Quick Start
//!
//! ```no_run
//! use casegen_embed::{EmbedConfig, TaskType, create_provider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = create_provider(&EmbedConfig::hashing(256))?;
//! let texts = vec!["Feature 1: Login".to_string()];
//! let result = provider.embed_texts(&texts, TaskType::RetrievalDocument).await?;
//! println!("{} embeddings of dimension {}", result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] using [`EmbedError`]. Provider failures
//! are never retried inside this crate.

pub mod config;
pub mod error;
pub mod gemini;
pub mod hashing;
#[cfg(feature = "fastembed")]
pub mod local;
pub mod provider;

// Re-export main types for easy access
pub use config::{EmbedConfig, EmbedConfigBuilder, ProviderKind};
pub use error::{EmbedError, Result};
pub use gemini::GeminiProvider;
pub use hashing::HashingProvider;
#[cfg(feature = "fastembed")]
pub use local::FastEmbedProvider;
pub use provider::{
    Embedding, EmbeddingProvider, EmbeddingResult, TaskType, create_provider, normalize,
};
