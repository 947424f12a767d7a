//! Question-answering pipeline orchestrator.
//!
//! The [`RagPipeline`] owns one document's lifecycle: it ingests the document
//! once (load → chunk → embed → index) and then answers any number of
//! questions against it (retrieve → compose).
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──ingest──▶ Ingesting ──ok──▶ Ready ◀──ask──┐
//!                               │                  └────────┘
//!                               └──err──▶ Failed
//! ```
//!
//! `ingest` may be called again from `Ready` or `Failed` to rebuild and
//! replace the index. Only one ingestion runs at a time; a concurrent call
//! fails with [`RagError::AlreadyIngesting`]. Questions asked outside `Ready`
//! fail with [`RagError::NotReady`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{DocumentSource, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .text_generator(Arc::new(my_llm))
//!     .build()?;
//!
//! pipeline.ingest(&DocumentSource::path("report.pdf")).await?;
//! let answer = pipeline.ask("What does the report conclude?").await?;
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, TextSplitter};
use crate::composer::{AnswerComposer, ComposeOptions};
use crate::config::RagConfig;
use crate::document::{Answer, Document, IndexEntry, RetrievalResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;
use crate::index::VectorIndex;
use crate::loader::DocumentSource;
use crate::retriever::Retriever;
use crate::retry::RetryPolicy;

/// Observable lifecycle state of a [`RagPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No ingestion has been attempted.
    Uninitialized,
    /// An ingestion is in flight.
    Ingesting,
    /// The index is built; questions can be answered.
    Ready,
    /// The last ingestion failed; no index is available.
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Uninitialized => "uninitialized",
            PipelineState::Ingesting => "ingesting",
            PipelineState::Ready => "ready",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

enum Stage {
    Uninitialized,
    Ingesting,
    Ready(Arc<VectorIndex>),
    Failed,
}

impl Stage {
    fn state(&self) -> PipelineState {
        match self {
            Stage::Uninitialized => PipelineState::Uninitialized,
            Stage::Ingesting => PipelineState::Ingesting,
            Stage::Ready(_) => PipelineState::Ready,
            Stage::Failed => PipelineState::Failed,
        }
    }
}

/// The question-answering pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`]. The pipeline is `Send + Sync`;
/// share it behind an `Arc` to answer questions concurrently. Queries never
/// hold a lock while waiting on a collaborator: they clone the immutable index
/// out of the pipeline state and work on that.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    text_generator: Arc<dyn TextGenerator>,
    chunker: Arc<dyn Chunker>,
    composer: AnswerComposer,
    retry: RetryPolicy,
    stage: RwLock<Stage>,
    ingest_lock: Mutex<()>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.stage.read().unwrap_or_else(PoisonError::into_inner).state()
    }

    /// Return the current index, if the pipeline is ready.
    pub fn index(&self) -> Option<Arc<VectorIndex>> {
        match &*self.stage.read().unwrap_or_else(PoisonError::into_inner) {
            Stage::Ready(index) => Some(Arc::clone(index)),
            _ => None,
        }
    }

    /// Load, chunk, embed and index a document, replacing any previous index.
    ///
    /// Embedding is done in batches of `embed_batch_size`; each batch is
    /// retried on transient failure without re-embedding earlier batches.
    /// Returns the number of indexed chunks.
    ///
    /// # Errors
    ///
    /// - [`RagError::AlreadyIngesting`] if another ingestion is in flight.
    /// - [`RagError::DocumentLoad`] if the source cannot be read.
    /// - [`RagError::EmptyCorpus`] if the document has no text.
    /// - [`RagError::DimensionMismatch`] if the provider returns vectors of
    ///   the wrong size.
    /// - Embedding errors once retries are exhausted.
    ///
    /// Any error leaves the pipeline [`Failed`](PipelineState::Failed).
    pub async fn ingest(&self, source: &DocumentSource) -> Result<usize> {
        let _guard = self.ingest_lock.try_lock().map_err(|_| {
            warn!(document.id = %source.id(), "rejected concurrent ingestion");
            RagError::AlreadyIngesting
        })?;

        let mut run = IngestRun::start(&self.stage);
        info!(document.id = %source.id(), "ingestion started");

        let result = async {
            let document = source.load().await?;
            self.build_index(&document).await
        }
        .await;

        match result {
            Ok(index) => {
                let chunk_count = index.len();
                run.finish(Stage::Ready(Arc::new(index)));
                info!(document.id = %source.id(), chunk_count, "ingestion complete");
                Ok(chunk_count)
            }
            Err(e) => {
                run.finish(Stage::Failed);
                error!(document.id = %source.id(), error = %e, "ingestion failed");
                Err(e)
            }
        }
    }

    /// Chunk, embed and index an already-loaded document.
    async fn build_index(&self, document: &Document) -> Result<VectorIndex> {
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            return Err(RagError::EmptyCorpus);
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for (batch_index, batch) in chunks.chunks(self.config.embed_batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.retry.run("embed_batch", || self.embed_checked(&texts)).await?;
            debug!(document.id = %document.id, batch_index, batch_size = batch.len(), "embedded batch");

            entries.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(chunk, embedding)| IndexEntry::new(chunk, embedding, &document.metadata)),
            );
        }

        let index = VectorIndex::build(entries)?;
        let expected = self.embedding_provider.dimensions();
        if index.dimensions() != expected {
            return Err(RagError::DimensionMismatch { expected, actual: index.dimensions() });
        }
        Ok(index)
    }

    /// Embed a batch, treating a short or long response as a provider failure.
    async fn embed_checked(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.embedding_provider.embed_batch(texts).await?;
        if embeddings.len() != texts.len() {
            return Err(RagError::EmbeddingUnavailable {
                provider: self.embedding_provider.name().to_string(),
                message: format!(
                    "returned {} embeddings for {} texts",
                    embeddings.len(),
                    texts.len()
                ),
            });
        }
        Ok(embeddings)
    }

    /// Retrieve the `top_k` chunks most similar to `question`.
    ///
    /// # Errors
    ///
    /// [`RagError::NotReady`] unless the pipeline is ready; embedding errors
    /// once retries are exhausted; [`RagError::DimensionMismatch`] if the
    /// provider's dimension changed since ingestion.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        let retriever = self.retriever()?;
        self.retry.run("retrieve", || retriever.retrieve(question, self.config.top_k)).await
    }

    /// Answer `question` from the ingested document.
    ///
    /// Dropping the returned future cancels the question; nothing it did
    /// persists.
    ///
    /// # Errors
    ///
    /// [`RagError::NotReady`] unless the pipeline is ready; embedding or
    /// generation errors once retries are exhausted.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let results = self.retrieve(question).await?;
        let generator = self.text_generator.as_ref();
        let answer = self
            .retry
            .run("generate", || self.composer.compose(question, &results, generator))
            .await?;

        info!(
            retrieved = results.len(),
            source_count = answer.sources.len(),
            "answered question"
        );
        Ok(answer)
    }

    fn retriever(&self) -> Result<Retriever> {
        let stage = self.stage.read().unwrap_or_else(PoisonError::into_inner);
        match &*stage {
            Stage::Ready(index) => Ok(Retriever::new(
                Arc::clone(&self.embedding_provider),
                Arc::clone(index),
            )
            .with_similarity_threshold(self.config.similarity_threshold)),
            other => Err(RagError::NotReady { state: other.state().to_string() }),
        }
    }
}

/// Marks the pipeline `Ingesting` and guarantees it leaves that state, even
/// if the ingestion future is dropped part-way.
struct IngestRun<'a> {
    stage: &'a RwLock<Stage>,
    finished: bool,
}

impl<'a> IngestRun<'a> {
    fn start(stage: &'a RwLock<Stage>) -> Self {
        *stage.write().unwrap_or_else(PoisonError::into_inner) = Stage::Ingesting;
        Self { stage, finished: false }
    }

    fn finish(&mut self, outcome: Stage) {
        *self.stage.write().unwrap_or_else(PoisonError::into_inner) = outcome;
        self.finished = true;
    }
}

impl Drop for IngestRun<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("ingestion cancelled");
            *self.stage.write().unwrap_or_else(PoisonError::into_inner) = Stage::Failed;
        }
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider` and `text_generator` are required. The config
/// defaults to [`RagConfig::default()`] and the chunker to a
/// [`TextSplitter`] using the config's chunk size and overlap.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::builder().top_k(5).build()?)
///     .embedding_provider(Arc::new(embedder))
///     .text_generator(Arc::new(llm))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    text_generator: Option<Arc<dyn TextGenerator>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the text generator used to compose answers.
    pub fn text_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.text_generator = Some(generator);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`] in the `Uninitialized` state.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if the config is invalid or a
    /// required collaborator is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::InvalidConfig("embedding_provider is required".to_string()))?;
        let text_generator = self
            .text_generator
            .ok_or_else(|| RagError::InvalidConfig("text_generator is required".to_string()))?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(TextSplitter::new(config.chunk_size, config.chunk_overlap)?),
        };

        Ok(RagPipeline {
            composer: AnswerComposer::new(ComposeOptions {
                require_sources: config.require_sources,
            }),
            retry: RetryPolicy::from_config(&config),
            config,
            embedding_provider,
            text_generator,
            chunker,
            stage: RwLock::new(Stage::Uninitialized),
            ingest_lock: Mutex::new(()),
        })
    }
}
