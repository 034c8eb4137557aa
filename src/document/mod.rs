//! Read-only document abstraction consumed by the narration core.
//!
//! A [`Document`] is an ordered list of pages that can each be asked for their
//! plain text. [`PdfDocument`] reads PDF files through `lopdf`, while
//! [`MemoryDocument`] wraps text that is already in memory.

pub mod pdf;

pub use pdf::PdfDocument;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to open PDF {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

pub trait Document: Send + Sync {
    /// Where the document was loaded from (a path or URL).
    fn source(&self) -> &str;

    fn page_count(&self) -> usize;

    /// Plain text of the page at `index`, or `None` when the page has no
    /// extractable text or the index is out of range.
    fn page_text(&self, index: usize) -> Option<String>;
}

/// Text extracted from a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    source: String,
    pages: Vec<Option<String>>,
}

impl MemoryDocument {
    pub fn new<I, S>(source: impl Into<String>, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: source.into(),
            pages: pages.into_iter().map(|page| Some(page.into())).collect(),
        }
    }

    /// Build a document where `None` entries model pages whose text cannot be
    /// extracted.
    pub fn from_pages(source: impl Into<String>, pages: Vec<Option<String>>) -> Self {
        Self {
            source: source.into(),
            pages,
        }
    }
}

impl Document for MemoryDocument {
    fn source(&self) -> &str {
        &self.source
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Option<String> {
        self.pages.get(index).cloned().flatten()
    }
}
