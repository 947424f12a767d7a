//! Deterministic collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use docqa_rag::{Embedding, EmbeddingProvider, RagError, Result, TextGenerator};

pub const DIM: usize = 32;

/// Hash the text bytes into a normalised vector whose direction depends on the content.
pub fn hash_embedding(text: &str, dimensions: usize) -> Embedding {
    let hash = text.bytes().fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
        (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
    });
    let mut emb = vec![0.0f32; dimensions];
    for (i, v) in emb.iter_mut().enumerate() {
        // splitmix64 step per component, mapped to [-1, 1).
        let mut z = hash.wrapping_add((i as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        *v = (z >> 40) as f32 / (1u64 << 23) as f32 - 1.0;
    }
    let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        emb.iter_mut().for_each(|x| *x /= norm);
    }
    emb
}

/// Deterministic embedder. Its output dimension can be changed after
/// construction to simulate a provider swap, and it can fail a number of
/// leading `embed_batch` calls with a transient error.
pub struct MockEmbedder {
    dimensions: AtomicUsize,
    declared_dimensions: Option<usize>,
    failures_left: AtomicUsize,
    batch_calls: AtomicUsize,
    delay: Option<Duration>,
    embedded: Mutex<Vec<String>>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: AtomicUsize::new(DIM),
            declared_dimensions: None,
            failures_left: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            delay: None,
            embedded: Mutex::new(Vec::new()),
        }
    }

    /// Fail the first `n` batch calls with `EmbeddingUnavailable`.
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Sleep before answering every batch call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report a dimension different from the vectors actually produced.
    pub fn declaring(mut self, dimensions: usize) -> Self {
        self.declared_dimensions = Some(dimensions);
        self
    }

    pub fn set_dimensions(&self, dimensions: usize) {
        self.dimensions.store(dimensions, Ordering::SeqCst);
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Texts embedded by successful batch calls, in order.
    pub fn embedded_texts(&self) -> Vec<String> {
        self.embedded.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(hash_embedding(text, self.dimensions.load(Ordering::SeqCst)))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(RagError::EmbeddingUnavailable {
                provider: "mock".into(),
                message: "503 Service Unavailable".into(),
            });
        }

        let dimensions = self.dimensions.load(Ordering::SeqCst);
        self.embedded.lock().unwrap().extend(texts.iter().map(|t| t.to_string()));
        Ok(texts.iter().map(|t| hash_embedding(t, dimensions)).collect())
    }

    fn dimensions(&self) -> usize {
        self.declared_dimensions.unwrap_or_else(|| self.dimensions.load(Ordering::SeqCst))
    }
}

/// Generator replying with a fixed text, recording every prompt it receives.
pub struct ScriptedGenerator {
    reply: String,
    failures_left: AtomicUsize,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            failures_left: AtomicUsize::new(0),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fail the first `n` calls with `GenerationUnavailable`.
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(RagError::GenerationUnavailable {
                provider: "scripted".into(),
                message: "429 Too Many Requests".into(),
            });
        }
        Ok(self.reply.clone())
    }
}
