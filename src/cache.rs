use log::debug;

use crate::{
    document::{Document, PageText},
    text::TextExtractor,
};

/// A page as held by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub index: usize,
    pub text: String,
}

impl CachedPage {
    fn new(page: &PageText) -> Self {
        Self {
            index: page.index,
            text: page.text.clone(),
        }
    }
}

/// Per-page text of the document being narrated.
///
/// Built once per narration session and read-only afterwards. The owner is
/// responsible for clearing it when another document is loaded.
#[derive(Debug, Default)]
pub struct PageTextCache {
    source: Option<String>,
    pages: Vec<CachedPage>,
}

impl PageTextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild(&mut self, document: &dyn Document) {
        let pages = TextExtractor::page_texts(document);
        self.fill(document.source(), &pages);
    }

    /// Replace every entry with already extracted pages.
    pub fn fill(&mut self, source: &str, pages: &[PageText]) {
        self.pages.clear();
        self.pages.extend(pages.iter().map(CachedPage::new));
        self.source = Some(source.to_string());
        debug!("Cached text of {} pages from {source}", self.pages.len());
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.source = None;
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[CachedPage] {
        &self.pages
    }

    /// Source of the document the entries were built from.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}
