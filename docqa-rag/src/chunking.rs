//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`TextSplitter`], which cuts
//! text into overlapping windows of at most `chunk_size` characters, preferring
//! to end each window at a whitespace boundary.

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s only; embeddings and metadata are
/// attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into overlapping windows of at most `chunk_size` characters.
///
/// Walking left to right, each chunk ends at the whitespace boundary closest
/// to (but not beyond) `chunk_size` characters, or at a hard cut when the
/// window contains no whitespace. The next chunk starts `chunk_overlap`
/// characters before the previous one ended, so adjacent chunks share exactly
/// `chunk_overlap` characters and every character of the text is covered.
///
/// Lengths and offsets are counted in `char`s, so cuts never split a UTF-8
/// sequence.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::TextSplitter;
///
/// let splitter = TextSplitter::new(1000, 200)?;
/// let chunks = splitter.split("report.pdf", &text);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a new `TextSplitter`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidConfig("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared by adjacent chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunks belonging to the document `document_id`.
    pub fn split(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        let ranges = self.char_ranges(text);
        if ranges.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, including the end of the text.
        let byte_offsets: Vec<usize> =
            text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len())).collect();

        ranges
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| Chunk {
                id: format!("{document_id}#{index}"),
                document_id: document_id.to_string(),
                index,
                text: text[byte_offsets[start]..byte_offsets[end]].to_string(),
                start,
                end,
                overlap: if index == 0 { 0 } else { self.chunk_overlap },
            })
            .collect()
    }

    /// Compute the `[start, end)` character ranges of each chunk.
    fn char_ranges(&self, text: &str) -> Vec<(usize, usize)> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        if len == 0 {
            return Vec::new();
        }

        let mut ranges = Vec::new();
        let mut start = 0;
        loop {
            if len - start <= self.chunk_size {
                ranges.push((start, len));
                break;
            }

            let hard_end = start + self.chunk_size;
            // The end must stay past `start + overlap` or the next chunk would not advance,
            // and past the first visible character so no chunk is whitespace only.
            let end = (start..hard_end)
                .find(|&i| !chars[i].is_whitespace())
                .map(|visible| (start + self.chunk_overlap).max(visible) + 1)
                .and_then(|lowest| {
                    (lowest..=hard_end)
                        .rev()
                        .find(|&e| chars[e - 1].is_whitespace() || chars[e].is_whitespace())
                })
                .unwrap_or(hard_end);

            ranges.push((start, end));
            start = end - self.chunk_overlap;
        }
        ranges
    }
}

impl Chunker for TextSplitter {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split(&document.id, &document.text)
    }
}
