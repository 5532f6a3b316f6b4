//! Length-bounded recursive splitting of free text.
//!
//! The splitter tries the most significant delimiter first (paragraph breaks),
//! and only falls back to weaker ones (list markers, line breaks, spaces) for
//! segments that are still longer than the bound. Segments that no delimiter
//! can shrink are cut at character boundaries. Adjacent segments are then
//! packed greedily into chunks of at most `max_chunk_length` bytes.
//!
//! Concatenating the produced chunks always reconstructs the input exactly.
//!
//! ```
//! use casegen_context::{ChunkingPolicy, RecursiveSplitter};
//!
//! let splitter = RecursiveSplitter::new(&[r"\n\n", r"\n", r" "], 40).unwrap();
//! let text = "First paragraph of the document.\n\nSecond paragraph, a bit longer than that.";
//! let chunks = splitter.split(text);
//!
//! assert!(chunks.len() > 1);
//! let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
//! assert_eq!(rebuilt, text);
//! ```

use crate::{ChunkingPolicy, TextChunk};
use regex::Regex;
use std::ops::Range;

/// Delimiters ordered from most to least significant.
///
/// - `\n\n`: paragraph breaks
/// - `^\s*[-*+]\s+`, `^\s*\d+\.\s+`: list item markers
/// - `\n`: line breaks
/// - ` `: spaces
pub const DEFAULT_DELIMITERS: &[&str] = &[
    r"\n\n",
    r"(?m)^\s*[-*+]\s+",
    r"(?m)^\s*\d+\.\s+",
    r"\n",
    r" ",
];

/// Recursive delimiter-driven splitter.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    delimiters: Vec<Regex>,
    max_chunk_length: usize,
}

impl RecursiveSplitter {
    /// Create a splitter from delimiter patterns, most significant first.
    ///
    /// A `max_chunk_length` of zero is treated as one.
    pub fn new(delimiter_patterns: &[&str], max_chunk_length: usize) -> Result<Self, regex::Error> {
        let delimiters = delimiter_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            delimiters,
            max_chunk_length: max_chunk_length.max(1),
        })
    }

    /// Splitter using [`DEFAULT_DELIMITERS`].
    pub fn with_defaults(max_chunk_length: usize) -> Result<Self, regex::Error> {
        Self::new(DEFAULT_DELIMITERS, max_chunk_length)
    }

    pub fn max_chunk_length(&self) -> usize {
        self.max_chunk_length
    }

    fn segments(&self, text: &str, delimiter_idx: usize, offset: usize) -> Vec<Range<usize>> {
        let mut segments = Vec::new();
        if text.is_empty() {
            return segments;
        }

        if text.len() <= self.max_chunk_length {
            segments.push(offset..offset + text.len());
            return segments;
        }

        // No delimiter left: cut by length on char boundaries
        let Some(delimiter) = self.delimiters.get(delimiter_idx) else {
            let mut start = 0;
            while start < text.len() {
                let mut end = (start + self.max_chunk_length).min(text.len());
                while !text.is_char_boundary(end) {
                    end += 1;
                }
                segments.push(offset + start..offset + end);
                start = end;
            }
            return segments;
        };

        let mut local_start = 0;
        for mat in delimiter.find_iter(text) {
            if mat.start() > local_start {
                segments.extend(self.segments(
                    &text[local_start..mat.start()],
                    delimiter_idx + 1,
                    offset + local_start,
                ));
            }
            if !mat.range().is_empty() {
                segments.push(offset + mat.start()..offset + mat.end());
            }
            local_start = mat.end();
        }

        if local_start < text.len() {
            segments.extend(self.segments(
                &text[local_start..],
                delimiter_idx + 1,
                offset + local_start,
            ));
        }

        segments
    }
}

impl ChunkingPolicy for RecursiveSplitter {
    fn split(&self, document: &str) -> Vec<TextChunk> {
        let mut chunks: Vec<TextChunk> = Vec::new();
        let mut current: Range<usize> = 0..0;

        for segment in self.segments(document, 0, 0) {
            if current.is_empty() {
                current = segment;
            } else if current.len() + segment.len() > self.max_chunk_length {
                chunks.push(TextChunk {
                    sequence: chunks.len(),
                    text: document[current.clone()].to_string(),
                });
                current = segment;
            } else {
                current.end = segment.end;
            }
        }

        if !current.is_empty() {
            chunks.push(TextChunk {
                sequence: chunks.len(),
                text: document[current].to_string(),
            });
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "recursive"
    }
}
