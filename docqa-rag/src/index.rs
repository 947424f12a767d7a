//! In-memory vector index using cosine similarity.
//!
//! [`VectorIndex`] is built once from a set of [`IndexEntry`]s and is
//! read-only afterwards, so it can be shared across concurrent queries behind
//! an `Arc` without locking. Search is a brute-force linear scan, which is
//! adequate for corpora up to roughly 100k chunks.

use crate::document::{Embedding, IndexEntry, RetrievalResult, SearchResult};
use crate::error::{RagError, Result};

/// An immutable, brute-force cosine-similarity index.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::VectorIndex;
///
/// let index = VectorIndex::build(entries)?;
/// let results = index.search(&query_embedding, 3)?;
/// ```
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
}

impl VectorIndex {
    /// Build an index from entries, fixing its dimension to that of the first entry.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyCorpus`] if `entries` is empty.
    /// - [`RagError::DimensionMismatch`] if the entries disagree on dimension.
    pub fn build(entries: Vec<IndexEntry>) -> Result<Self> {
        let dimensions = entries.first().map(|e| e.embedding.len()).ok_or(RagError::EmptyCorpus)?;
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(RagError::DimensionMismatch {
                expected: dimensions,
                actual: bad.embedding.len(),
            });
        }
        Ok(Self { entries, dimensions })
    }

    /// The fixed dimension of every vector in the index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries. Always `false` for a built index.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The indexed entries, in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Return at most `k` entries ranked by descending cosine similarity.
    ///
    /// Ties keep insertion order, so identical inputs always produce the same
    /// ranking. Asking for more entries than the index holds returns them all.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidConfig`] if `k == 0`.
    /// - [`RagError::DimensionMismatch`] if the query's dimension differs from the index's.
    pub fn search(&self, query: &Embedding, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(RagError::InvalidConfig("k must be greater than zero".to_string()));
        }
        if query.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&entry.embedding, query)))
            .collect();

        // Stable sort: equal scores stay in chunk order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let entry = &self.entries[i];
                SearchResult {
                    chunk: entry.chunk.clone(),
                    score,
                    metadata: entry.metadata.clone(),
                }
            })
            .collect())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude. The result is clamped to
/// `[-1.0, 1.0]` so rounding never pushes it outside the cosine range.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
