use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::document::{Document, PageText};

static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("markup tag pattern is valid"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("the document has no extractable text")]
    NoExtractableText,
}

/// Pulls per-page text out of a [`Document`] and assembles the narration
/// buffer.
pub struct TextExtractor;

impl TextExtractor {
    /// One entry per page, in page order. Pages that fail to extract yield an
    /// empty string.
    pub fn page_texts(document: &dyn Document) -> Vec<PageText> {
        (0..document.page_count())
            .map(|index| PageText {
                index,
                text: document.page_text(index).unwrap_or_default(),
            })
            .collect()
    }

    /// Join the pages with newlines and sanitize the result.
    pub fn narration_text(pages: &[PageText]) -> Result<String, ExtractError> {
        let joined = pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let sanitized = sanitize(&joined);
        debug!(
            "Sanitized {} pages into {} characters",
            pages.len(),
            sanitized.chars().count()
        );
        if sanitized.is_empty() {
            return Err(ExtractError::NoExtractableText);
        }
        Ok(sanitized)
    }

    pub fn extract(document: &dyn Document) -> Result<(Vec<PageText>, String), ExtractError> {
        let pages = Self::page_texts(document);
        let text = Self::narration_text(&pages)?;
        Ok((pages, text))
    }
}

/// Strip markup tags, replace `&nbsp;` entities by spaces and trim.
pub fn sanitize(raw: &str) -> String {
    MARKUP_TAG
        .replace_all(raw, "")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;

    #[test]
    fn joins_pages_with_newlines() {
        let document = MemoryDocument::new("memory://fox", ["The quick fox", "jumps over"]);
        let (pages, text) = TextExtractor::extract(&document).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].text, "jumps over");
        assert_eq!(text, "The quick fox\njumps over");
    }

    #[test]
    fn strips_tags_and_entities() {
        assert_eq!(
            sanitize("  <b>Hola</b>&nbsp;mundo<br/>\n"),
            "Hola mundo"
        );
    }

    #[test]
    fn unreadable_pages_become_empty() {
        let document =
            MemoryDocument::from_pages("memory://gaps", vec![None, Some("Texto".into()), None]);
        let pages = TextExtractor::page_texts(&document);
        assert_eq!(pages[0].text, "");
        assert_eq!(pages[1].text, "Texto");
        assert_eq!(TextExtractor::narration_text(&pages).unwrap(), "Texto");
    }

    #[test]
    fn blank_document_has_no_text() {
        let document = MemoryDocument::new("memory://blank", ["", "  \n", "<p></p>&nbsp;"]);
        assert_eq!(
            TextExtractor::extract(&document).unwrap_err(),
            ExtractError::NoExtractableText
        );
    }
}
