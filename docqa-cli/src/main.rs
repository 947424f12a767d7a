//! `docqa`: ask questions about a document from the terminal.
//!
//! ```text
//! docqa report.pdf
//! docqa notes.txt --provider openai --top-k 5 --sources
//! ```
//!
//! API keys are read from the environment, or from a `.env` file in the
//! working directory.

use anyhow::Context;
use clap::Parser;
use docqa_cli::{Cli, console, providers};
use docqa_rag::{DocumentSource, RagPipeline};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("docqa_rag=debug,docqa_cli=debug,docqa=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (for the provider API key).
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.rag_config()?;
    let api_key = providers::resolve_api_key(cli.provider, |name| std::env::var(name).ok())?;
    let (embedder, generator) = providers::build(&cli, api_key)?;

    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .text_generator(generator)
        .build()?;

    println!("Loading {}...", cli.path.display());
    let chunk_count = pipeline
        .ingest(&DocumentSource::path(&cli.path))
        .await
        .with_context(|| format!("failed to ingest {}", cli.path.display()))?;
    println!("Indexed {chunk_count} chunks.\n");

    console::run(&pipeline, cli.sources).await
}
