//! Local ONNX embeddings through FastEmbed

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, TaskType, normalize};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    match name.to_ascii_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        other => Err(EmbedError::invalid_config(format!(
            "unsupported fastembed model: {other}"
        ))),
    }
}

/// FastEmbed-based embedding provider using a built-in ONNX model
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
    e5_prefixes: bool,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Load the configured model. Downloads it on first use.
    pub fn new(config: EmbedConfig) -> Result<Self> {
        let model_kind = resolve_model(&config.model_name)?;
        tracing::info!("Loading fastembed model: {}", config.model_name);

        let mut model = TextEmbedding::try_new(
            InitOptions::new(model_kind).with_show_download_progress(false),
        )
        .map_err(|e| EmbedError::External { source: e })?;

        let probe = model
            .embed(vec!["probe"], None)
            .map_err(|e| EmbedError::External { source: e })?;
        let dimension = probe.first().map(|e| e.len()).unwrap_or(config.dimension);
        tracing::info!("Model loaded successfully. Dimension: {}", dimension);

        let e5_prefixes = config.model_name.to_ascii_lowercase().contains("e5");
        Ok(Self {
            config,
            model: Arc::new(Mutex::new(model)),
            dimension,
            e5_prefixes,
        })
    }

    fn prepare(&self, texts: &[String], task: TaskType) -> Vec<String> {
        if !self.e5_prefixes {
            return texts.to_vec();
        }
        let prefix = match task {
            TaskType::RetrievalQuery => "query: ",
            TaskType::RetrievalDocument => "passage: ",
        };
        texts.iter().map(|t| format!("{prefix}{t}")).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_texts(&self, texts: &[String], task: TaskType) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size) {
            let prepared = self.prepare(chunk, task);
            let model = Arc::clone(&self.model);

            let batch = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                let mut guard = model
                    .lock()
                    .map_err(|_| EmbedError::invalid_config("fastembed model lock poisoned"))?;
                guard
                    .embed(prepared, None)
                    .map_err(|e| EmbedError::External { source: e })
            })
            .await??;

            all_embeddings.extend(batch);
        }

        if self.config.normalize {
            all_embeddings.iter_mut().for_each(|e| normalize(e));
        }
        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}
