//! Credential lookup and provider construction.

use std::sync::Arc;

use anyhow::{Result, bail};
use docqa_rag::{
    EmbeddingProvider, GeminiEmbeddingProvider, GeminiTextGenerator, OpenAIEmbeddingProvider,
    OpenAITextGenerator, TextGenerator,
};

use crate::args::{Cli, Provider};

/// Environment variables holding the API key, in lookup order.
pub fn key_variables(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::Gemini => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
        Provider::Openai => &["OPENAI_API_KEY"],
    }
}

/// Find the provider's API key through `lookup` (normally the process environment).
///
/// Empty values are treated as unset.
///
/// # Errors
///
/// Fails naming the expected variables when none is set.
pub fn resolve_api_key(
    provider: Provider,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    let names = key_variables(provider);
    match names.iter().filter_map(|&name| lookup(name)).find(|key| !key.trim().is_empty()) {
        Some(key) => Ok(key),
        None => bail!("{} must be set (in the environment or a .env file)", names.join(" or ")),
    }
}

/// The embedding provider and text generator selected by the arguments.
pub fn build(
    cli: &Cli,
    api_key: String,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn TextGenerator>)> {
    match cli.provider {
        Provider::Gemini => {
            let mut embedder = GeminiEmbeddingProvider::new(api_key.clone())?;
            if let Some(model) = &cli.embedding_model {
                let dimensions = cli.embedding_dimensions.unwrap_or_else(|| embedder.dimensions());
                embedder = embedder.with_model(model, dimensions);
            }
            let mut generator = GeminiTextGenerator::new(api_key)?;
            if let Some(model) = &cli.chat_model {
                generator = generator.with_model(model);
            }
            Ok((
                Arc::new(embedder) as Arc<dyn EmbeddingProvider>,
                Arc::new(generator) as Arc<dyn TextGenerator>,
            ))
        }
        Provider::Openai => {
            let mut embedder = OpenAIEmbeddingProvider::new(api_key.clone())?;
            if let Some(model) = &cli.embedding_model {
                let dimensions = cli.embedding_dimensions.unwrap_or_else(|| embedder.dimensions());
                embedder = embedder.with_model(model, dimensions);
            }
            let mut generator = OpenAITextGenerator::new(api_key)?;
            if let Some(model) = &cli.chat_model {
                generator = generator.with_model(model);
            }
            Ok((
                Arc::new(embedder) as Arc<dyn EmbeddingProvider>,
                Arc::new(generator) as Arc<dyn TextGenerator>,
            ))
        }
    }
}
