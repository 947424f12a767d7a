//! Query-time retrieval: embed the question, then search the index.

use std::sync::Arc;

use tracing::debug;

use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::VectorIndex;

/// Finds the chunks most similar to a query.
///
/// A `Retriever` is cheap to clone and holds no mutable state; the only side
/// effect of [`retrieve`](Retriever::retrieve) is the embedding call.
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    similarity_threshold: f32,
}

impl Retriever {
    /// Create a retriever over `index` that embeds queries with `embedding_provider`.
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>, index: Arc<VectorIndex>) -> Self {
        Self { embedding_provider, index, similarity_threshold: f32::NEG_INFINITY }
    }

    /// Drop results scoring below `threshold`.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// The index being searched.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Return at most `k` chunks ranked by descending similarity to `query`.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures unchanged, and
    /// [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch) if the
    /// provider's vectors no longer match the index.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let query_embedding = self.embedding_provider.embed(query).await?;
        let mut results = self.index.search(&query_embedding, k)?;
        results.retain(|r| r.score >= self.similarity_threshold);
        debug!(
            provider = self.embedding_provider.name(),
            k,
            result_count = results.len(),
            "retrieved chunks"
        );
        Ok(results)
    }
}
