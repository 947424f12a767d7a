//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use docqa_rag::{RagConfig, Result};

/// Model provider backing embeddings and generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    /// Google Gemini (`GOOGLE_API_KEY` or `GEMINI_API_KEY`).
    Gemini,
    /// OpenAI (`OPENAI_API_KEY`).
    Openai,
}

/// Ask questions about a document.
#[derive(Debug, Parser)]
#[command(name = "docqa", version, about)]
pub struct Cli {
    /// Document to load: a PDF, or any UTF-8 text file.
    pub path: PathBuf,

    /// Model provider for embeddings and answers.
    #[arg(long, value_enum, default_value_t = Provider::Gemini)]
    pub provider: Provider,

    /// Chat model used to compose answers.
    #[arg(long)]
    pub chat_model: Option<String>,

    /// Embedding model used for chunks and questions.
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// Vector size produced by `--embedding-model`.
    #[arg(long, requires = "embedding_model")]
    pub embedding_dimensions: Option<usize>,

    /// Maximum chunk size in characters.
    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters shared by adjacent chunks.
    #[arg(long, default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question.
    #[arg(long, default_value_t = 3)]
    pub top_k: usize,

    /// Deadline for each provider call, in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Ask the model to cite its sources and print them after each answer.
    #[arg(long)]
    pub sources: bool,

    /// Log pipeline activity to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The pipeline configuration described by the arguments.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`](docqa_rag::RagError::InvalidConfig)
    /// for inconsistent chunking or retrieval parameters.
    pub fn rag_config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .request_timeout_secs(self.timeout_secs)
            .require_sources(self.sources)
            .build()
    }
}
