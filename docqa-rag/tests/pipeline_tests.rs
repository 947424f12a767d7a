//! Scenario tests for the pipeline lifecycle, retries and grounded answers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{DIM, MockEmbedder, ScriptedGenerator};
use docqa_rag::{
    DocumentSource, PipelineState, RagConfig, RagError, RagPipeline, RetryConfig, TextSplitter,
};

const SKY: &str = "The sky is blue.";

fn config() -> docqa_rag::RagConfigBuilder {
    RagConfig::builder().retry(RetryConfig {
        max_attempts: 3,
        initial_backoff_ms: 200,
        max_backoff_ms: 2000,
        multiplier: 2.0,
    })
}

fn pipeline(
    config: RagConfig,
    embedder: &Arc<MockEmbedder>,
    generator: &Arc<ScriptedGenerator>,
) -> RagPipeline {
    RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder.clone())
        .text_generator(generator.clone())
        .build()
        .unwrap()
}

fn default_pipeline() -> (RagPipeline, Arc<MockEmbedder>, Arc<ScriptedGenerator>) {
    let embedder = Arc::new(MockEmbedder::new());
    let generator = Arc::new(ScriptedGenerator::replying("Blue."));
    let pipeline = pipeline(config().build().unwrap(), &embedder, &generator);
    (pipeline, embedder, generator)
}

// ── Lifecycle ──────────────────────────────────────────────────────

#[tokio::test]
async fn asking_before_ingestion_is_not_ready() {
    let (pipeline, _, generator) = default_pipeline();
    assert_eq!(pipeline.state(), PipelineState::Uninitialized);

    let err = pipeline.ask("What colour is the sky?").await.unwrap_err();
    assert!(matches!(err, RagError::NotReady { ref state } if state == "uninitialized"));
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn an_empty_document_fails_ingestion() {
    let (pipeline, embedder, _) = default_pipeline();

    let err = pipeline.ingest(&DocumentSource::text("empty", "")).await.unwrap_err();
    assert!(matches!(err, RagError::EmptyCorpus));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(embedder.batch_calls(), 0);

    let err = pipeline.ask("anything?").await.unwrap_err();
    assert!(matches!(err, RagError::NotReady { ref state } if state == "failed"));
}

#[tokio::test]
async fn a_missing_file_fails_ingestion() {
    let (pipeline, _, _) = default_pipeline();

    let err = pipeline
        .ingest(&DocumentSource::path("/nonexistent/docqa/book.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::DocumentLoad { .. }));
    assert_eq!(pipeline.state(), PipelineState::Failed);
}

#[tokio::test]
async fn ingestion_indexes_every_chunk() {
    let (pipeline, embedder, _) = default_pipeline();
    let text = "word ".repeat(500);

    let count = pipeline.ingest(&DocumentSource::text("words", text.clone())).await.unwrap();

    let expected = TextSplitter::new(1000, 200).unwrap().split("words", &text);
    assert_eq!(count, expected.len());
    assert_eq!(pipeline.state(), PipelineState::Ready);
    let index = pipeline.index().unwrap();
    assert_eq!(index.len(), expected.len());
    assert_eq!(index.dimensions(), DIM);
    assert_eq!(embedder.batch_calls(), 1);
}

#[tokio::test]
async fn reingesting_replaces_the_index() {
    let (pipeline, _, _) = default_pipeline();
    pipeline.ingest(&DocumentSource::text("first", "Cats purr.")).await.unwrap();
    pipeline.ingest(&DocumentSource::text("second", SKY)).await.unwrap();

    let results = pipeline.retrieve("What colour is the sky?").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source_label(), "second#0");
}

#[tokio::test]
async fn a_failed_reingest_discards_the_previous_index() {
    let (pipeline, _, _) = default_pipeline();
    pipeline.ingest(&DocumentSource::text("first", SKY)).await.unwrap();

    pipeline.ingest(&DocumentSource::text("second", "")).await.unwrap_err();
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(pipeline.index().is_none());
}

#[tokio::test(start_paused = true)]
async fn concurrent_ingestion_is_rejected() {
    let embedder = Arc::new(MockEmbedder::new().with_delay(Duration::from_secs(1)));
    let generator = Arc::new(ScriptedGenerator::replying("Blue."));
    let pipeline = pipeline(config().build().unwrap(), &embedder, &generator);
    let source = DocumentSource::text("sky", SKY);

    let (first, second, question) = tokio::join!(
        pipeline.ingest(&source),
        async {
            tokio::task::yield_now().await;
            pipeline.ingest(&source).await
        },
        async {
            tokio::task::yield_now().await;
            let state = pipeline.state();
            (state, pipeline.ask("What colour is the sky?").await)
        },
    );

    assert_eq!(first.unwrap(), 1);
    assert!(matches!(second, Err(RagError::AlreadyIngesting)));
    let (state, answer) = question;
    assert_eq!(state, PipelineState::Ingesting);
    assert!(matches!(answer, Err(RagError::NotReady { ref state }) if state == "ingesting"));
    assert_eq!(pipeline.state(), PipelineState::Ready);
    assert_eq!(embedder.batch_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_ingestion_leaves_the_pipeline_failed() {
    let embedder = Arc::new(MockEmbedder::new().with_delay(Duration::from_secs(10)));
    let generator = Arc::new(ScriptedGenerator::replying("Blue."));
    let pipeline = pipeline(config().build().unwrap(), &embedder, &generator);

    let outcome = tokio::time::timeout(
        Duration::from_millis(100),
        pipeline.ingest(&DocumentSource::text("sky", SKY)),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(pipeline.state(), PipelineState::Failed);
    pipeline.ingest(&DocumentSource::text("sky", SKY)).await.unwrap();
    assert_eq!(pipeline.state(), PipelineState::Ready);
}

// ── Retries and timeouts ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn transient_embedding_failures_are_retried() {
    let embedder = Arc::new(MockEmbedder::new().failing_first(2));
    let generator = Arc::new(ScriptedGenerator::replying("Blue."));
    let pipeline = pipeline(config().build().unwrap(), &embedder, &generator);

    let count = pipeline.ingest(&DocumentSource::text("sky", SKY)).await.unwrap();

    assert_eq!(count, 1);
    assert_eq!(embedder.batch_calls(), 3);
    assert_eq!(embedder.embedded_texts(), [SKY]);
    assert_eq!(pipeline.state(), PipelineState::Ready);
}

#[tokio::test(start_paused = true)]
async fn exhausted_embedding_retries_fail_ingestion() {
    let embedder = Arc::new(MockEmbedder::new().failing_first(3));
    let generator = Arc::new(ScriptedGenerator::replying("Blue."));
    let pipeline = pipeline(config().build().unwrap(), &embedder, &generator);

    let err = pipeline.ingest(&DocumentSource::text("sky", SKY)).await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingUnavailable { .. }));
    assert_eq!(embedder.batch_calls(), 3);
    assert_eq!(pipeline.state(), PipelineState::Failed);
}

#[tokio::test(start_paused = true)]
async fn a_retried_batch_does_not_reembed_earlier_batches() {
    let embedder = Arc::new(MockEmbedder::new().failing_first(1));
    let generator = Arc::new(ScriptedGenerator::replying("ok"));
    let config = config().chunk_size(10).chunk_overlap(0).embed_batch_size(2).build().unwrap();
    let pipeline = pipeline(config, &embedder, &generator);
    let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";

    let count = pipeline.ingest(&DocumentSource::text("greek", text)).await.unwrap();

    let chunks = TextSplitter::new(10, 0).unwrap().split("greek", text);
    let expected: Vec<String> = chunks.into_iter().map(|c| c.text).collect();
    assert_eq!(count, expected.len());
    assert_eq!(embedder.embedded_texts(), expected);
    assert_eq!(embedder.batch_calls(), expected.len().div_ceil(2) + 1);
}

#[tokio::test(start_paused = true)]
async fn transient_generation_failures_are_retried() {
    let embedder = Arc::new(MockEmbedder::new());
    let generator = Arc::new(ScriptedGenerator::replying("Blue.").failing_first(2));
    let pipeline = pipeline(config().build().unwrap(), &embedder, &generator);
    pipeline.ingest(&DocumentSource::text("sky", SKY)).await.unwrap();

    let answer = pipeline.ask("What colour is the sky?").await.unwrap();

    assert_eq!(answer.text, "Blue.");
    assert_eq!(generator.prompts().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_generation_retries_surface_and_keep_the_index() {
    let embedder = Arc::new(MockEmbedder::new());
    let generator = Arc::new(ScriptedGenerator::replying("Blue.").failing_first(3));
    let pipeline = pipeline(config().build().unwrap(), &embedder, &generator);
    pipeline.ingest(&DocumentSource::text("sky", SKY)).await.unwrap();

    let err = pipeline.ask("What colour is the sky?").await.unwrap_err();

    assert!(matches!(err, RagError::GenerationUnavailable { .. }));
    assert_eq!(generator.prompts().len(), 3);
    assert_eq!(pipeline.state(), PipelineState::Ready);
}

#[tokio::test(start_paused = true)]
async fn slow_generation_times_out() {
    let embedder = Arc::new(MockEmbedder::new());
    let generator =
        Arc::new(ScriptedGenerator::replying("Blue.").with_delay(Duration::from_secs(60)));
    let config = config()
        .request_timeout_secs(1)
        .retry(RetryConfig {
            max_attempts: 2,
            initial_backoff_ms: 100,
            max_backoff_ms: 100,
            multiplier: 1.0,
        })
        .build()
        .unwrap();
    let pipeline = pipeline(config, &embedder, &generator);
    pipeline.ingest(&DocumentSource::text("sky", SKY)).await.unwrap();

    let err = pipeline.ask("What colour is the sky?").await.unwrap_err();

    assert!(matches!(
        err,
        RagError::Timeout { ref operation, timeout } if operation == "generate" && timeout == Duration::from_secs(1)
    ));
    assert_eq!(generator.prompts().len(), 2);
    assert_eq!(pipeline.state(), PipelineState::Ready);
}

#[tokio::test(start_paused = true)]
async fn a_dropped_question_leaves_the_pipeline_ready() {
    let embedder = Arc::new(MockEmbedder::new());
    let generator =
        Arc::new(ScriptedGenerator::replying("Blue.").with_delay(Duration::from_secs(10)));
    let pipeline = pipeline(config().build().unwrap(), &embedder, &generator);
    pipeline.ingest(&DocumentSource::text("sky", SKY)).await.unwrap();

    let outcome =
        tokio::time::timeout(Duration::from_millis(100), pipeline.ask("What colour?")).await;

    assert!(outcome.is_err());
    assert_eq!(pipeline.state(), PipelineState::Ready);
    assert_eq!(pipeline.index().unwrap().len(), 1);
}

// ── Dimensions ─────────────────────────────────────────────────────

#[tokio::test]
async fn a_misreported_dimension_fails_ingestion() {
    let embedder = Arc::new(MockEmbedder::new().declaring(DIM + 1));
    let generator = Arc::new(ScriptedGenerator::replying("Blue."));
    let pipeline = pipeline(config().build().unwrap(), &embedder, &generator);

    let err = pipeline.ingest(&DocumentSource::text("sky", SKY)).await.unwrap_err();

    assert!(matches!(err, RagError::DimensionMismatch { expected, actual } if expected == DIM + 1 && actual == DIM));
    assert_eq!(pipeline.state(), PipelineState::Failed);
}

#[tokio::test]
async fn a_provider_swap_after_ingestion_is_a_dimension_mismatch() {
    let (pipeline, embedder, generator) = default_pipeline();
    pipeline.ingest(&DocumentSource::text("sky", SKY)).await.unwrap();
    embedder.set_dimensions(DIM * 2);

    let err = pipeline.ask("What colour is the sky?").await.unwrap_err();

    assert!(matches!(err, RagError::DimensionMismatch { expected, actual } if expected == DIM && actual == DIM * 2));
    assert!(generator.prompts().is_empty());
    assert_eq!(pipeline.state(), PipelineState::Ready);
}

// ── Answers ────────────────────────────────────────────────────────

#[tokio::test]
async fn answers_are_grounded_on_retrieved_chunks() {
    let (pipeline, _, generator) = default_pipeline();
    pipeline.ingest(&DocumentSource::text("sky", SKY)).await.unwrap();

    let answer = pipeline.ask("What colour is the sky?").await.unwrap();

    assert_eq!(answer.text, "Blue.");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].label, "sky#0");

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("[source: sky#0]\nThe sky is blue."));
    assert!(prompts[0].contains("Question: What colour is the sky?"));
    assert!(prompts[0].contains("don't know"));
    assert!(!prompts[0].contains("SOURCES:"));
}

#[tokio::test]
async fn retrieval_returns_at_most_top_k_chunks() {
    let embedder = Arc::new(MockEmbedder::new());
    let generator = Arc::new(ScriptedGenerator::replying("ok"));
    let config = config().chunk_size(20).chunk_overlap(5).top_k(2).build().unwrap();
    let pipeline = pipeline(config, &embedder, &generator);
    let text = "Rust is fast. Paris is in France. The sky is blue. Water is wet.";
    let count = pipeline.ingest(&DocumentSource::text("facts", text)).await.unwrap();
    assert!(count > 2);

    let results = pipeline.retrieve("Where is Paris?").await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].score >= results[1].score);
}

#[tokio::test]
async fn cited_sources_are_split_from_the_answer() {
    let embedder = Arc::new(MockEmbedder::new());
    let generator = Arc::new(ScriptedGenerator::replying("Paris is in France.\nSOURCES: facts#1"));
    let config =
        config().chunk_size(20).chunk_overlap(0).top_k(10).require_sources(true).build().unwrap();
    let pipeline = pipeline(config, &embedder, &generator);
    let text = "Rust is fast. Paris is in France. The sky is blue.";
    let count = pipeline.ingest(&DocumentSource::text("facts", text)).await.unwrap();
    assert!(count >= 2);

    let answer = pipeline.ask("Where is Paris?").await.unwrap();

    assert_eq!(answer.text, "Paris is in France.");
    let labels: Vec<&str> = answer.sources.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, ["facts#1"]);
    assert_eq!(answer.sources[0].metadata.get("chunk_index").map(String::as_str), Some("1"));
    assert!(generator.prompts()[0].contains("\"SOURCES:\""));
}

#[tokio::test]
async fn questions_can_be_asked_concurrently() {
    let (pipeline, _, generator) = default_pipeline();
    pipeline.ingest(&DocumentSource::text("sky", SKY)).await.unwrap();
    let pipeline = Arc::new(pipeline);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.ask(&format!("question {i}")).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().text, "Blue.");
    }
    assert_eq!(generator.prompts().len(), 4);
}

// ── Construction ───────────────────────────────────────────────────

#[test]
fn the_builder_requires_both_collaborators() {
    let embedder = Arc::new(MockEmbedder::new());
    let generator = Arc::new(ScriptedGenerator::replying("ok"));

    let missing_generator = RagPipeline::builder().embedding_provider(embedder).build();
    assert!(matches!(missing_generator, Err(RagError::InvalidConfig(_))));

    let missing_embedder = RagPipeline::builder().text_generator(generator).build();
    assert!(matches!(missing_embedder, Err(RagError::InvalidConfig(_))));
}

#[test]
fn the_builder_rejects_invalid_configs() {
    let embedder = Arc::new(MockEmbedder::new());
    let generator = Arc::new(ScriptedGenerator::replying("ok"));

    for config in [
        RagConfig { top_k: 0, ..RagConfig::default() },
        RagConfig { chunk_size: 100, chunk_overlap: 100, ..RagConfig::default() },
        RagConfig { embed_batch_size: 0, ..RagConfig::default() },
    ] {
        let result = RagPipeline::builder()
            .config(config)
            .embedding_provider(embedder.clone())
            .text_generator(generator.clone())
            .build();
        assert!(matches!(result, Err(RagError::InvalidConfig(_))));
    }
}
