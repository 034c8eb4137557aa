//! Maps the text range a speech engine is about to speak back onto a page.
//!
//! The narration buffer is a sanitized concatenation of every page, so the
//! spoken fragment is looked up again in the per-page text. Pages are scanned
//! in index order and the first page containing the fragment wins; the lookup
//! is best effort and gives up silently when nothing matches.

use serde::Serialize;
use thiserror::Error;

use crate::{
    cache::PageTextCache,
    text::{
        search::{find_chars, literal_ignoring_case},
        CharRange,
    },
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("range {range:?} lies outside the utterance")]
    OutOfBounds { range: CharRange },
    #[error("range {range:?} selects no text")]
    EmptyFragment { range: CharRange },
    #[error("no cached page contains {fragment:?}")]
    NoMatchFound { fragment: String },
    #[error("cannot search for {fragment:?}: {message}")]
    Pattern { fragment: String, message: String },
}

/// The chunk of an utterance an engine reported as about to be spoken.
#[derive(Debug, Clone, Copy)]
pub struct SpeechRangeEvent<'a> {
    pub utterance: &'a str,
    pub range: CharRange,
}

/// A page-local character span the viewer can scroll to and highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedSelection {
    pub page_index: usize,
    pub range: CharRange,
}

pub struct SpeechRangeResolver<'c> {
    cache: &'c PageTextCache,
}

impl<'c> SpeechRangeResolver<'c> {
    pub fn new(cache: &'c PageTextCache) -> Self {
        Self { cache }
    }

    pub fn resolve(&self, event: &SpeechRangeEvent<'_>) -> Result<ResolvedSelection, ResolveError> {
        let fragment = event
            .range
            .slice(event.utterance)
            .ok_or(ResolveError::OutOfBounds { range: event.range })?;
        if fragment.is_empty() {
            return Err(ResolveError::EmptyFragment { range: event.range });
        }

        let pattern = literal_ignoring_case(fragment).map_err(|err| ResolveError::Pattern {
            fragment: fragment.to_string(),
            message: err.to_string(),
        })?;
        self.cache
            .pages()
            .iter()
            .find_map(|page| {
                find_chars(&pattern, &page.text).map(|range| ResolvedSelection {
                    page_index: page.index,
                    range,
                })
            })
            .ok_or_else(|| ResolveError::NoMatchFound {
                fragment: fragment.to_string(),
            })
    }
}
