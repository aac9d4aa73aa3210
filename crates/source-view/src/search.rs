//! Search-match overlay with a navigable cursor list.
//!
//! All public inputs/outputs use **character offsets** (not byte offsets).
//! A query is compiled into a regex (escaped first unless regex mode is
//! requested), every non-empty occurrence in the document is collected as a
//! match cursor, and navigation steps through the cursor list circularly in
//! either direction.
//!
//! The overlay holds document-wide matches; only their viewport
//! intersection ever becomes decorations (see
//! [`build_search_highlights`](crate::decoration::build_search_highlights)).

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Options that control how search is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// If `true`, performs a case-sensitive search.
    pub case_sensitive: bool,
    /// If `true`, matches only whole words (ASCII-alphanumeric and `_`).
    pub whole_word: bool,
    /// If `true`, treats the query as a regex pattern.
    pub regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
            regex: false,
        }
    }
}

/// One search match, as a half-open character range plus the matched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRange {
    /// Inclusive start character offset.
    pub from: usize,
    /// Exclusive end character offset.
    pub to: usize,
    /// The text the cursor matched.
    pub matched_text: String,
}

impl MatchRange {
    /// Returns the length of the match in characters.
    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    /// Returns `true` if the match is empty.
    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }
}

/// Search errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The provided regex pattern failed to compile.
    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),
}

#[derive(Debug)]
pub(crate) struct CharIndex {
    char_to_byte: Vec<usize>,
    text_len: usize,
}

impl CharIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self {
            char_to_byte,
            text_len: text.len(),
        }
    }

    pub(crate) fn char_count(&self) -> usize {
        self.char_to_byte.len().saturating_sub(1)
    }

    pub(crate) fn byte_to_char(&self, byte_offset: usize) -> usize {
        let clamped = byte_offset.min(self.text_len);
        match self.char_to_byte.binary_search(&clamped) {
            Ok(idx) => idx,
            Err(idx) => idx,
        }
    }

    pub(crate) fn char_at(&self, text: &str, char_offset: usize) -> Option<char> {
        if char_offset >= self.char_count() {
            return None;
        }
        let start = self.char_to_byte[char_offset];
        let end = self.char_to_byte[char_offset + 1];
        text.get(start..end)?.chars().next()
    }
}

fn compile_search_regex(query: &str, options: SearchOptions) -> Result<Regex, SearchError> {
    let pattern = if options.regex {
        query.to_string()
    } else {
        regex::escape(query)
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .multi_line(true)
        .build()
        .map_err(SearchError::InvalidRegex)
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

fn is_whole_word(text: &str, index: &CharIndex, from: usize, to: usize) -> bool {
    let before = if from == 0 {
        None
    } else {
        index.char_at(text, from.saturating_sub(1))
    };
    let after = index.char_at(text, to);

    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Find all occurrences of `query` in `text`, as character-offset ranges.
///
/// Empty matches are skipped; an empty query yields an empty list.
pub fn find_all(
    text: &str,
    query: &str,
    options: SearchOptions,
) -> Result<Vec<MatchRange>, SearchError> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let re = compile_search_regex(query, options)?;
    let index = CharIndex::new(text);

    let mut matches: Vec<MatchRange> = Vec::new();
    for m in re.find_iter(text) {
        let from = index.byte_to_char(m.start());
        let to = index.byte_to_char(m.end());
        if from >= to {
            continue;
        }
        if options.whole_word && !is_whole_word(text, &index, from, to) {
            continue;
        }
        matches.push(MatchRange {
            from,
            to,
            matched_text: m.as_str().to_string(),
        });
    }

    Ok(matches)
}

/// Document-wide search state: the active class, the full match list, and
/// the navigation position within it.
#[derive(Debug, Default)]
pub struct SearchOverlay {
    class_name: Option<String>,
    cursors: Vec<MatchRange>,
    current_index: Option<usize>,
}

impl SearchOverlay {
    /// Create an inactive overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a search over `text` and replace the overlay state with its
    /// results.
    ///
    /// Returns the number of matches. With no matches the overlay stays
    /// active (the class is retained) but has no current cursor; otherwise
    /// the first match becomes current.
    pub fn highlight(
        &mut self,
        text: &str,
        query: &str,
        options: SearchOptions,
        class_name: impl Into<String>,
    ) -> Result<usize, SearchError> {
        let cursors = find_all(text, query, options)?;
        self.class_name = Some(class_name.into());
        self.current_index = if cursors.is_empty() { None } else { Some(0) };
        self.cursors = cursors;
        Ok(self.cursors.len())
    }

    /// Drop all search state. Idempotent.
    pub fn clear(&mut self) {
        self.class_name = None;
        self.cursors.clear();
        self.current_index = None;
    }

    /// Returns `true` while a search is active.
    pub fn is_active(&self) -> bool {
        self.class_name.is_some()
    }

    /// The active highlight class, if any.
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// All matches, in document order.
    pub fn cursors(&self) -> &[MatchRange] {
        &self.cursors
    }

    /// Index of the current match in the cursor list.
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// The current match.
    pub fn current(&self) -> Option<&MatchRange> {
        self.cursors.get(self.current_index?)
    }

    /// Advance to the next match (or the previous one with `reverse`),
    /// wrapping around at either end of the list.
    ///
    /// Returns `None` when the match list is empty.
    pub fn next_cursor(&mut self, reverse: bool) -> Option<&MatchRange> {
        if self.cursors.is_empty() {
            return None;
        }
        let len = self.cursors.len();
        let next = match self.current_index {
            Some(i) if reverse => (i + len - 1) % len,
            Some(i) => (i + 1) % len,
            None if reverse => len - 1,
            None => 0,
        };
        self.current_index = Some(next);
        self.cursors.get(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn overlay_with(text: &str, query: &str) -> SearchOverlay {
        let mut overlay = SearchOverlay::new();
        overlay
            .highlight(text, query, SearchOptions::default(), "cm-searching")
            .unwrap();
        overlay
    }

    #[test]
    fn test_highlight_collects_matches_in_char_offsets() {
        // Multibyte prefix shifts byte offsets away from char offsets.
        let overlay = overlay_with("héllo foo bar foo", "foo");
        assert_eq!(overlay.cursors().len(), 2);
        assert_eq!(overlay.cursors()[0].from, 6);
        assert_eq!(overlay.cursors()[0].to, 9);
        assert_eq!(overlay.cursors()[1].from, 14);
        assert_eq!(overlay.cursors()[0].matched_text, "foo");
    }

    #[test]
    fn test_first_match_is_current_after_highlight() {
        let overlay = overlay_with("a b a", "a");
        assert_eq!(overlay.current_index(), Some(0));
        assert_eq!(overlay.current().unwrap().from, 0);
    }

    #[test]
    fn test_next_cursor_wraps_forward() {
        let mut overlay = overlay_with("x x x", "x");
        let steps: Vec<usize> = (0..4)
            .map(|_| {
                overlay.next_cursor(false);
                overlay.current_index().unwrap()
            })
            .collect();
        assert_eq!(steps, vec![1, 2, 0, 1]);
    }

    #[test]
    fn test_next_cursor_wraps_backward() {
        let mut overlay = overlay_with("x x x", "x");
        overlay.next_cursor(true);
        assert_eq!(overlay.current_index(), Some(2));
        overlay.next_cursor(true);
        assert_eq!(overlay.current_index(), Some(1));
    }

    #[test]
    fn test_no_matches_yields_no_cursor() {
        let mut overlay = overlay_with("alpha beta", "zzz");
        assert!(overlay.is_active());
        assert_eq!(overlay.current_index(), None);
        assert!(overlay.next_cursor(false).is_none());
        assert!(overlay.next_cursor(true).is_none());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut overlay = overlay_with("x x", "x");
        overlay.clear();
        overlay.clear();
        assert!(!overlay.is_active());
        assert!(overlay.cursors().is_empty());
        assert_eq!(overlay.current_index(), None);
    }

    #[test]
    fn test_regex_mode_and_case_folding() {
        let mut overlay = SearchOverlay::new();
        let options = SearchOptions {
            case_sensitive: false,
            whole_word: false,
            regex: true,
        };
        overlay
            .highlight("Foo1 foo2 bar", r"foo\d", options, "hit")
            .unwrap();
        assert_eq!(overlay.cursors().len(), 2);
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        let mut overlay = SearchOverlay::new();
        let options = SearchOptions {
            regex: true,
            ..SearchOptions::default()
        };
        let result = overlay.highlight("text", "(unclosed", options, "hit");
        assert!(matches!(result, Err(SearchError::InvalidRegex(_))));
    }

    #[test]
    fn test_whole_word_filtering() {
        let matches = find_all(
            "cat concatenate cat",
            "cat",
            SearchOptions {
                whole_word: true,
                ..SearchOptions::default()
            },
        )
        .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].from, 0);
        assert_eq!(matches[1].from, 16);
    }
}
