//! Splitting of requirement documents at `Feature <n>:` headers.

use crate::{ChunkingPolicy, TextChunk};
use regex::Regex;

const FEATURE_HEADER: &str = r"(?m)^[ \t]*Feature \d+:";

/// One chunk per feature block.
///
/// A block starts at a line whose first non-blank text is `Feature <digits>:`
/// and runs to the next such line or to the end of the document. Blocks are
/// trimmed of surrounding whitespace. Text before the first header is kept at
/// the front of the first block. A document without headers yields no chunks.
#[derive(Debug, Clone)]
pub struct FeatureBlockSplitter {
    header: Regex,
}

impl FeatureBlockSplitter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            header: Regex::new(FEATURE_HEADER)?,
        })
    }
}

impl ChunkingPolicy for FeatureBlockSplitter {
    fn split(&self, document: &str) -> Vec<TextChunk> {
        let starts: Vec<usize> = self
            .header
            .find_iter(document)
            .map(|m| m.start())
            .collect();

        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let start = if i == 0 { 0 } else { start };
                let end = starts.get(i + 1).copied().unwrap_or(document.len());
                document[start..end].trim()
            })
            .filter(|block| !block.is_empty())
            .enumerate()
            .map(|(sequence, block)| TextChunk {
                sequence,
                text: block.to_string(),
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "feature_blocks"
    }
}
