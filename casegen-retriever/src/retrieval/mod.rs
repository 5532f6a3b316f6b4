//! Read and write paths over the collection registry
//!
//! ```text
//! IngestionPipeline → ChunkingPolicy → EmbeddingProvider (document) → VectorDb::commit
//! RetrievalEngine → EmbeddingProvider (query) → VectorDb::retrieve → chunk texts
//! ```

pub mod ingestion;
pub mod retrieval_engine;
pub mod vector_db;

use crate::config::{CasegenConfig, DEFAULT_DISTANCE_THRESHOLD};
use crate::error::{Result, RetrieverError};
use crate::storage::{ChunkId, Handle, Metadata, MetadataFilter};
use casegen_embed::{EmbeddingProvider, create_provider};
use serde::Serialize;
use std::sync::Arc;

pub use ingestion::{IngestReport, IngestionPipeline, chunk_id_for};
pub use retrieval_engine::RetrievalEngine;
pub use vector_db::VectorDb;

/// Parameters of one retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalRequest {
    pub metadata_filter: MetadataFilter,
    /// Inclusive upper bound on distance
    pub distance_threshold: f32,
    pub max_results: Option<usize>,
}

impl Default for RetrievalRequest {
    fn default() -> Self {
        Self {
            metadata_filter: MetadataFilter::default(),
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            max_results: None,
        }
    }
}

impl RetrievalRequest {
    pub fn new(metadata_filter: MetadataFilter, distance_threshold: f32) -> Self {
        Self {
            metadata_filter,
            distance_threshold,
            max_results: None,
        }
    }

    /// Default threshold, restricted to one user's chunks.
    pub fn for_user(user_id: &str) -> Self {
        Self {
            metadata_filter: MetadataFilter::for_user(user_id),
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, distance_threshold: f32) -> Self {
        self.distance_threshold = distance_threshold;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// A retrieved chunk together with where and how far it was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk_id: ChunkId,
    pub text: String,
    pub metadata: Metadata,
    pub handle: Handle,
    pub distance: f32,
}

/// A shared registry plus the read and write paths built over it.
#[derive(Clone)]
pub struct Retriever {
    pub db: Arc<VectorDb>,
    pub ingestion: Arc<IngestionPipeline>,
    pub engine: Arc<RetrievalEngine>,
}

impl Retriever {
    /// Build the stack described by `config`, creating its embedding provider.
    pub fn from_config(config: &CasegenConfig) -> Result<Self> {
        let provider = create_provider(&config.embedding)?;
        Self::with_provider(config, provider)
    }

    /// Build the stack around an existing provider.
    pub fn with_provider(
        config: &CasegenConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let policy = casegen_context::policy_for(
            config.ingestion.chunking,
            config.ingestion.max_chunk_length,
        )
        .map_err(|e| RetrieverError::Config(e.to_string()))?;

        let db = Arc::new(VectorDb::new(config.retrieval.metric));
        let ingestion = IngestionPipeline::new(
            db.clone(),
            provider.clone(),
            Arc::from(policy),
            config.ingestion.clone(),
        );
        let engine = RetrievalEngine::new(db.clone(), provider, config.retrieval.clone());

        Ok(Self {
            db,
            ingestion: Arc::new(ingestion),
            engine: Arc::new(engine),
        })
    }
}
