//! Text generation trait for the answer-producing language model.

use async_trait::async_trait;

use crate::error::Result;

/// A language model that turns a prompt into text.
///
/// Failures should be reported as
/// [`RagError::GenerationUnavailable`](crate::RagError::GenerationUnavailable).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// A short name for the backend, used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
