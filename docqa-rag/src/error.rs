//! Error types for the `docqa-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while ingesting a document or answering a question.
///
/// Configuration and data-shape errors (`InvalidConfig`, `EmptyCorpus`,
/// `DimensionMismatch`) abort the current operation. Collaborator failures
/// (`EmbeddingUnavailable`, `GenerationUnavailable`, `Timeout`) are
/// transient and retried by the pipeline before being surfaced.
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunking or pipeline parameters are invalid. Raised before any I/O.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The document produced no chunks to index.
    #[error("Empty corpus: the document contains no indexable text")]
    EmptyCorpus,

    /// A vector's dimensionality differs from the index's fixed dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension fixed by the index.
        expected: usize,
        /// The dimension of the offending vector.
        actual: usize,
    },

    /// The embedding provider failed (network, authentication, quota).
    #[error("Embedding unavailable ({provider}): {message}")]
    EmbeddingUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The text generator failed (network, authentication, quota).
    #[error("Generation unavailable ({provider}): {message}")]
    GenerationUnavailable {
        /// The text generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A collaborator call exceeded its deadline.
    #[error("Timeout: {operation} did not complete within {timeout:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// A query was issued before a successful ingestion.
    #[error("Pipeline not ready (state: {state})")]
    NotReady {
        /// The pipeline state at the time of the call.
        state: String,
    },

    /// Another ingestion is already in flight on this pipeline.
    #[error("An ingestion is already in progress")]
    AlreadyIngesting,

    /// The document source could not be read or decoded.
    #[error("Failed to load document '{source_id}': {message}")]
    DocumentLoad {
        /// The path or identifier of the document source.
        source_id: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    /// Whether the error is a transient collaborator failure worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingUnavailable { .. }
                | RagError::GenerationUnavailable { .. }
                | RagError::Timeout { .. }
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
