//! Loading documents from files or raw strings.
//!
//! PDF files are extracted with the `pdf-extract` crate (feature `pdf`) on a
//! blocking thread; every other file is read as UTF-8 text.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Where a document's text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// A file on disk. PDFs are text-extracted; other files are read as UTF-8.
    Path(PathBuf),
    /// Text supplied directly by the caller.
    Text {
        /// Identifier used for the resulting document and its chunk labels.
        id: String,
        /// The raw document text.
        text: String,
    },
}

impl DocumentSource {
    /// A file source.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// A raw-text source.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text { id: id.into(), text: text.into() }
    }

    /// Identifier the loaded document will carry.
    pub fn id(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Text { id, .. } => id.clone(),
        }
    }

    /// Read the source into a [`Document`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentLoad`] if the file cannot be read, is not
    /// valid UTF-8, or is a PDF and the `pdf` feature is disabled.
    pub async fn load(&self) -> Result<Document> {
        match self {
            Self::Text { id, text } => Ok(Document::new(id.clone(), text.clone())),
            Self::Path(path) => {
                let id = path.display().to_string();
                let text = if is_pdf(path) { read_pdf(path).await? } else { read_text(path).await? };
                info!(document.id = %id, chars = text.chars().count(), "loaded document");
                Ok(Document::new(id, text).with_metadata("path", path.display().to_string()))
            }
        }
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn load_error(path: &Path, message: impl Into<String>) -> RagError {
    RagError::DocumentLoad { source_id: path.display().to_string(), message: message.into() }
}

async fn read_text(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await.map_err(|e| load_error(path, e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| load_error(path, format!("not valid UTF-8: {e}")))
}

#[cfg(feature = "pdf")]
async fn read_pdf(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await.map_err(|e| load_error(path, e.to_string()))?;
    // pdf-extract is CPU-bound and synchronous.
    let text = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| load_error(path, format!("extraction task failed: {e}")))?
    .map_err(|message| load_error(path, message))?;
    Ok(text)
}

#[cfg(not(feature = "pdf"))]
async fn read_pdf(path: &Path) -> Result<String> {
    Err(load_error(path, "PDF support requires the `pdf` feature"))
}
