use regex::{Regex, RegexBuilder};

use super::CharRange;

/// Literal pattern for `needle` that ignores case using Unicode case folding.
pub fn literal_ignoring_case(needle: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
}

/// First match of `pattern` in `text`, as a character range of `text`.
pub fn find_chars(pattern: &Regex, text: &str) -> Option<CharRange> {
    let found = pattern.find(text)?;
    if found.as_str().is_empty() {
        return None;
    }
    let start = text[..found.start()].chars().count();
    Some(CharRange::new(start, found.as_str().chars().count()))
}
