//! Where document text comes from
//!
//! The assistant only ever sees a link chosen by the user. A [`DocumentSource`]
//! turns that link into plain text; hosted document services plug in here.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Plain text of the document behind `link`.
    async fn fetch(&self, link: &str) -> Result<String>;
}

/// Reads documents from the local filesystem.
///
/// Links are paths, optionally prefixed with `file://`. Relative paths are
/// resolved against the configured root.
#[derive(Debug, Clone)]
pub struct FileDocumentSource {
    root: PathBuf,
}

impl FileDocumentSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, link: &str) -> PathBuf {
        let path = Path::new(link.strip_prefix("file://").unwrap_or(link));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Default for FileDocumentSource {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

#[async_trait]
impl DocumentSource for FileDocumentSource {
    async fn fetch(&self, link: &str) -> Result<String> {
        let path = self.resolve(link);
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(text.trim().to_string())
    }
}

/// Fixed set of documents keyed by link.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentSource {
    documents: HashMap<String, String>,
}

impl InMemoryDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document<L: Into<String>, T: Into<String>>(mut self, link: L, text: T) -> Self {
        self.documents.insert(link.into(), text.into());
        self
    }
}

#[async_trait]
impl DocumentSource for InMemoryDocumentSource {
    async fn fetch(&self, link: &str) -> Result<String> {
        match self.documents.get(link) {
            Some(text) => Ok(text.clone()),
            None => bail!("no document registered for this link"),
        }
    }
}
