//! # docqa-rag
//!
//! Document-grounded question answering.
//!
//! A [`RagPipeline`] ingests one document (a PDF, a text file or a raw
//! string), splits it into overlapping chunks, embeds and indexes them, and
//! then answers questions by retrieving the most similar chunks and asking a
//! language model to answer from those chunks alone.
//!
//! Embedding and generation are capability traits ([`EmbeddingProvider`],
//! [`TextGenerator`]), so any provider can be plugged in. Gemini and OpenAI
//! adapters are available behind the `gemini` and `openai` features; PDF
//! extraction is behind the `pdf` feature.
//!
//! ```text
//! text ─▶ TextSplitter ─▶ EmbeddingProvider ─▶ VectorIndex
//! question ─▶ EmbeddingProvider ─▶ VectorIndex::search ─▶ AnswerComposer ─▶ Answer
//! ```

pub mod chunking;
pub mod composer;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod retriever;
pub mod retry;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, TextSplitter};
pub use composer::{AnswerComposer, ComposeOptions, SOURCES_MARKER};
pub use config::{RagConfig, RagConfigBuilder, RetryConfig};
pub use document::{
    Answer, Chunk, Document, Embedding, IndexEntry, RetrievalResult, SearchResult, SourceRef,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::TextGenerator;
pub use index::{VectorIndex, cosine_similarity};
pub use loader::DocumentSource;
pub use pipeline::{PipelineState, RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;
pub use retry::RetryPolicy;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiEmbeddingProvider, GeminiTextGenerator};
#[cfg(feature = "openai")]
pub use openai::{OpenAIEmbeddingProvider, OpenAITextGenerator};
