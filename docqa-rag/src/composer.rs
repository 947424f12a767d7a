//! Grounded answer composition.
//!
//! The [`AnswerComposer`] turns a question and its retrieved chunks into a
//! prompt that confines the generator to the supplied context, calls the
//! [`TextGenerator`], and splits any trailing `SOURCES:` section off the reply
//! into structured [`SourceRef`]s.

use tracing::debug;

use crate::document::{Answer, SearchResult, SourceRef};
use crate::error::Result;
use crate::generation::TextGenerator;

/// Marker introducing the sources section of a generated answer.
pub const SOURCES_MARKER: &str = "SOURCES:";

/// Options controlling prompt construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Instruct the generator to cite the chunks it used in a `SOURCES:` section.
    pub require_sources: bool,
}

/// Builds grounded prompts and turns generator replies into [`Answer`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerComposer {
    options: ComposeOptions,
}

impl AnswerComposer {
    /// Create a composer with the given options.
    pub fn new(options: ComposeOptions) -> Self {
        Self { options }
    }

    /// The composer's options.
    pub fn options(&self) -> ComposeOptions {
        self.options
    }

    /// Build the prompt for `query` grounded on `chunks`.
    ///
    /// Chunk text and the query are embedded verbatim.
    pub fn build_prompt(&self, query: &str, chunks: &[SearchResult]) -> String {
        let mut prompt = String::from(
            "Use the following pieces of context to answer the user's question.\n\
             Answer only from the context below. If the context does not contain the answer, \
             just say that you don't know; don't try to make up an answer.\n",
        );
        if self.options.require_sources {
            prompt.push_str(
                "ALWAYS finish your answer with a \"SOURCES:\" line listing, separated by commas, \
                 the source labels of the context passages you used.\n",
            );
        }

        prompt.push_str("\nContext:\n");
        for chunk in chunks {
            prompt.push_str(&format!("[source: {}]\n{}\n\n", chunk.source_label(), chunk.chunk.text));
        }

        prompt.push_str(&format!(
            "Question: {query}\n\nAnswer the question based on the context provided."
        ));
        prompt
    }

    /// Generate a grounded answer to `query` from `chunks`.
    ///
    /// # Errors
    ///
    /// Propagates the generator's error, normally
    /// [`RagError::GenerationUnavailable`](crate::RagError::GenerationUnavailable).
    pub async fn compose(
        &self,
        query: &str,
        chunks: &[SearchResult],
        generator: &dyn TextGenerator,
    ) -> Result<Answer> {
        let prompt = self.build_prompt(query, chunks);
        debug!(
            generator = generator.name(),
            prompt_len = prompt.len(),
            chunk_count = chunks.len(),
            "generating answer"
        );
        let reply = generator.generate(&prompt).await?;
        Ok(self.parse_reply(&reply, chunks))
    }

    /// Split a generator reply into answer text and source references.
    ///
    /// With `require_sources`, the text after the last `SOURCES:` marker is
    /// matched against the chunks' labels; cited chunks become the sources in
    /// citation order. When nothing is cited (or sources are not required),
    /// every retrieved chunk is listed in rank order.
    pub fn parse_reply(&self, reply: &str, chunks: &[SearchResult]) -> Answer {
        let all_sources = || chunks.iter().map(source_ref).collect::<Vec<_>>();

        if !self.options.require_sources {
            return Answer { text: reply.trim().to_string(), sources: all_sources() };
        }

        // ASCII lowercasing keeps byte offsets aligned with `reply`.
        let Some(pos) = reply.to_ascii_lowercase().rfind(&SOURCES_MARKER.to_ascii_lowercase())
        else {
            return Answer { text: reply.trim().to_string(), sources: all_sources() };
        };

        let text = reply[..pos].trim().to_string();
        let cited = &reply[pos + SOURCES_MARKER.len()..];

        let mut sources: Vec<SourceRef> = Vec::new();
        for label in cited.split([',', '\n', ';']).map(clean_label).filter(|l| !l.is_empty()) {
            if sources.iter().any(|s| s.label == label) {
                continue;
            }
            if let Some(chunk) = chunks.iter().find(|c| c.source_label() == label) {
                sources.push(source_ref(chunk));
            }
        }

        if sources.is_empty() {
            sources = all_sources();
        }
        Answer { text, sources }
    }
}

fn source_ref(result: &SearchResult) -> SourceRef {
    SourceRef { label: result.source_label(), metadata: result.metadata.clone() }
}

/// Strip list bullets, brackets, quotes and a `source:` prefix from a cited label.
fn clean_label(raw: &str) -> &str {
    let trimmed = raw.trim().trim_start_matches(['-', '*']).trim();
    let trimmed = trimmed.trim_matches(|c: char| matches!(c, '[' | ']' | '"' | '\'' | '`' | '.'));
    let trimmed = trimmed.strip_prefix("source:").unwrap_or(trimmed);
    trimmed.trim()
}
