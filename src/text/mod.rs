//! Plain-text helpers shared by the extractor, the page cache and the speech
//! engines.
//!
//! Every offset handled here counts Unicode scalar values (`char`s), never
//! bytes, so a range reported by an engine can be applied to any copy of the
//! same text regardless of how it is encoded in memory.

pub mod extract;
pub mod search;

pub use extract::{sanitize, ExtractError, TextExtractor};

use serde::Serialize;

/// A contiguous span of characters, addressed by start offset and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CharRange {
    pub start: usize,
    pub len: usize,
}

impl CharRange {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Borrow the characters covered by this range, or `None` when the range
    /// runs past the end of `text`.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        let start = byte_offset(text, self.start)?;
        let end = byte_offset(&text[start..], self.len)? + start;
        Some(&text[start..end])
    }
}

fn byte_offset(text: &str, chars: usize) -> Option<usize> {
    if chars == 0 {
        return Some(0);
    }
    match text.char_indices().nth(chars) {
        Some((idx, _)) => Some(idx),
        None if text.chars().count() == chars => Some(text.len()),
        None => None,
    }
}

/// Split `text` into word ranges: maximal runs of non-whitespace characters.
pub fn word_ranges(text: &str) -> Vec<CharRange> {
    let mut words = Vec::new();
    let mut current: Option<usize> = None;
    let mut position = 0;

    for (offset, ch) in text.chars().enumerate() {
        position = offset + 1;
        match (ch.is_whitespace(), current) {
            (true, Some(start)) => {
                words.push(CharRange::new(start, offset - start));
                current = None;
            }
            (false, None) => current = Some(offset),
            _ => {}
        }
    }

    if let Some(start) = current {
        words.push(CharRange::new(start, position - start));
    }

    words
}
