//! Data types for documents, chunks, index entries, search results and answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A fixed-dimension vector produced by an
/// [`EmbeddingProvider`](crate::EmbeddingProvider).
pub type Embedding = Vec<f32>;

/// Metadata key holding a chunk's human-readable source label.
pub const SOURCE_KEY: &str = "source";

/// A source document: immutable raw text plus an identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document (for files, the path).
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new() }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A contiguous segment of a [`Document`].
///
/// Offsets are measured in characters (Unicode scalar values), not bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Unique identifier for the chunk: `{document_id}#{index}`.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Position of the chunk in the document's chunk sequence.
    pub index: usize,
    /// The text content of the chunk.
    pub text: String,
    /// Character offset of the first character (inclusive).
    pub start: usize,
    /// Character offset one past the last character (exclusive).
    pub end: usize,
    /// Number of leading characters shared with the previous chunk.
    pub overlap: usize,
}

impl Chunk {
    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }

    /// The label used to cite this chunk in prompts and answers.
    pub fn source_label(&self) -> String {
        format!("{}#{}", self.document_id, self.index)
    }
}

/// A chunk stored in the index together with its embedding and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// The indexed chunk.
    pub chunk: Chunk,
    /// The vector embedding of the chunk's text.
    pub embedding: Embedding,
    /// Metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
}

impl IndexEntry {
    /// Build an entry whose metadata is the document's metadata plus the
    /// chunk's `source`, `chunk_index`, `start` and `end` fields.
    pub fn new(chunk: Chunk, embedding: Embedding, document_metadata: &HashMap<String, String>) -> Self {
        let mut metadata = document_metadata.clone();
        metadata.insert(SOURCE_KEY.to_string(), chunk.source_label());
        metadata.insert("chunk_index".to_string(), chunk.index.to_string());
        metadata.insert("start".to_string(), chunk.start.to_string());
        metadata.insert("end".to_string(), chunk.end.to_string());
        Self { chunk, embedding, metadata }
    }
}

/// A retrieved [`Chunk`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The cosine similarity to the query (higher is more relevant).
    pub score: f32,
    /// The metadata of the index entry.
    pub metadata: HashMap<String, String>,
}

impl SearchResult {
    /// The chunk's source label, falling back to the derived label when the
    /// metadata carries none.
    pub fn source_label(&self) -> String {
        self.metadata.get(SOURCE_KEY).cloned().unwrap_or_else(|| self.chunk.source_label())
    }
}

/// Search results ordered by descending score, at most `k` long.
pub type RetrievalResult = Vec<SearchResult>;

/// A reference to a chunk that grounded an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// The chunk's source label.
    pub label: String,
    /// The chunk's metadata.
    pub metadata: HashMap<String, String>,
}

/// Generated text plus the sources it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The answer text, without any trailing sources section.
    pub text: String,
    /// Ordered references to the chunks used.
    pub sources: Vec<SourceRef>,
}
