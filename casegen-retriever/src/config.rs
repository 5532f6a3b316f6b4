//! TOML configuration for the retrieval core
//!
//! ```toml
//! [embedding]
//! provider = "gemini"
//! model_name = "embedding-001"
//!
//! [retrieval]
//! distance_threshold = 0.7
//! max_results = 20
//! metric = "squared_l2"
//!
//! [ingestion]
//! chunking = "feature_blocks"
//! purge_stale = true
//! ```
//!
//! Every section and field is optional and falls back to its default.

use crate::error::{Result, RetrieverError};
use crate::storage::DistanceMetric;
use casegen_context::{ChunkingKind, DEFAULT_MAX_CHUNK_LENGTH};
use casegen_embed::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Distance threshold the reference embedding model was tuned against.
pub const DEFAULT_DISTANCE_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum distance for a chunk to count as relevant (inclusive)
    pub distance_threshold: f32,
    /// Optional hard cap on results per call; unbounded when unset
    pub max_results: Option<usize>,
    pub metric: DistanceMetric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            max_results: None,
            metric: DistanceMetric::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub chunking: ChunkingKind,
    /// Upper bound for the recursive splitter
    pub max_chunk_length: usize,
    /// Retire a user's previous vectors and drop their leftover chunks on re-ingest
    pub purge_stale: bool,
    /// Store a non-blank document whole when the splitter finds no chunks
    pub fallback_whole_document: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingKind::default(),
            max_chunk_length: DEFAULT_MAX_CHUNK_LENGTH,
            purge_stale: true,
            fallback_whole_document: true,
        }
    }
}

/// Top-level configuration for a retrieval stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CasegenConfig {
    pub embedding: EmbedConfig,
    pub retrieval: RetrievalConfig,
    pub ingestion: IngestionConfig,
}

impl CasegenConfig {
    /// Read and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            RetrieverError::Config(message) => {
                RetrieverError::Config(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| RetrieverError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.retrieval.distance_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(RetrieverError::Config(format!(
                "distance_threshold must be a non-negative number, got {threshold}"
            )));
        }
        if self.ingestion.max_chunk_length == 0 {
            return Err(RetrieverError::Config(
                "max_chunk_length must be at least 1".to_string(),
            ));
        }
        self.embedding
            .validate()
            .map_err(|e| RetrieverError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casegen_embed::ProviderKind;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CasegenConfig::default();
        assert_eq!(config.retrieval.distance_threshold, 0.7);
        assert_eq!(config.retrieval.max_results, None);
        assert_eq!(config.retrieval.metric, DistanceMetric::SquaredL2);
        assert_eq!(config.ingestion.chunking, ChunkingKind::FeatureBlocks);
        assert!(config.ingestion.purge_stale);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(
            CasegenConfig::from_toml_str("").unwrap(),
            CasegenConfig::default()
        );
    }

    #[test]
    fn test_partial_sections() {
        let config = CasegenConfig::from_toml_str(
            r#"
            [embedding]
            provider = "gemini"

            [retrieval]
            max_results = 5
            metric = "l2"

            [ingestion]
            chunking = "recursive"
            purge_stale = false
            "#,
        )
        .unwrap();

        assert_eq!(config.embedding.provider, ProviderKind::Gemini);
        assert_eq!(config.retrieval.max_results, Some(5));
        assert_eq!(config.retrieval.metric, DistanceMetric::L2);
        assert_eq!(config.retrieval.distance_threshold, 0.7);
        assert_eq!(config.ingestion.chunking, ChunkingKind::Recursive);
        assert!(!config.ingestion.purge_stale);
        assert!(config.ingestion.fallback_whole_document);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            CasegenConfig::from_toml_str("[retrieval]\ndistance_threshold = -1.0"),
            Err(RetrieverError::Config(_))
        ));
        assert!(matches!(
            CasegenConfig::from_toml_str("[retrieval]\nmetric = \"cosine\""),
            Err(RetrieverError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[retrieval]\ndistance_threshold = 1.5").unwrap();

        let config = CasegenConfig::load(file.path()).unwrap();
        assert_eq!(config.retrieval.distance_threshold, 1.5);

        let missing = CasegenConfig::load(Path::new("/nonexistent/casegen.toml"));
        assert!(matches!(missing, Err(RetrieverError::Io(_))));
    }
}
