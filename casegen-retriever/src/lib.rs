//! casegen-retriever: in-memory, multi-tenant semantic retrieval
//!
//! Stores embedded text chunks per named collection and answers "which stored
//! text is closest to this query, among this user's chunks" with a distance
//! threshold, duplicate suppression and exact-match metadata filtering.
//!
//! ## Key Modules
//!
//! - **[`storage`]**: vector index, identifier map, chunk store and the
//!   per-collection atomic write batch
//! - **[`retrieval`]**: collection registry, ingestion pipeline and retrieval engine
//! - **[`config`]**: TOML configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use casegen_retriever::{config::CasegenConfig, retrieval::Retriever};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let retriever = Retriever::from_config(&CasegenConfig::default())?;
//! retriever
//!     .ingestion
//!     .ingest("u1", "specification", "Feature 1: Login\nUsers sign in.")
//!     .await?;
//! let texts = retriever.engine.find_similar("login", "specification", "u1").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! document → ChunkingPolicy → EmbeddingProvider → WriteBatch ─┐
//!                                                             ↓
//!                        VectorDb { collection → Collection { VectorIndex, IdentifierMap, ChunkStore } }
//!                                                             ↑
//! query → EmbeddingProvider → search → resolve → get → filter ┘
//! ```

pub mod config;
pub mod error;
pub mod retrieval;
pub mod storage;

pub use error::{Result, RetrieverError};
