//! Rope engine (modern variant).
//!
//! Backs the [`TextEngine`] contract with a [`ropey::Rope`] for O(log n)
//! line access on large documents, an offset-based viewport, anchor-offset
//! scroll snapshots, and parse-coverage tracking for the syntax-aware hooks.
//!
//! Token discovery uses Unicode word boundaries: a single forward lookup
//! from a position yields the character range of the word segment covering
//! it, which is what position-content class markers decorate.

use crate::engine::{
    Change, Effect, EngineError, Position, ScrollSnapshot, SnapshotRepr, TextEngine, Transaction,
    UpdateNotice, Viewport, ViewportPadding, content_fingerprint,
};
use ropey::Rope;
use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;

/// A [`TextEngine`] backed by a rope.
pub struct RopeEngine {
    rope: Rope,
    cursor: usize,
    selection: Option<Range<usize>>,
    scroll_top: usize,
    viewport_height: Option<usize>,
    /// Character offset the background parse has covered so far.
    parsed_upto: usize,
}

impl RopeEngine {
    /// Create an engine over `text`. The document starts syntax-incomplete
    /// until the host reports parse progress.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: 0,
            selection: None,
            scroll_top: 0,
            viewport_height: None,
            parsed_upto: 0,
        }
    }

    /// Create an engine over an empty document.
    pub fn empty() -> Self {
        Self::new("")
    }

    fn clamp_state(&mut self) {
        let len = self.rope.len_chars();
        self.cursor = self.cursor.min(len);
        if let Some(range) = self.selection.take() {
            let start = range.start.min(len);
            let end = range.end.min(len);
            if start < end {
                self.selection = Some(start..end);
            }
        }
        self.scroll_top = self.scroll_top.min(self.rope.len_lines().saturating_sub(1));
    }

    fn line_len(&self, line: usize) -> usize {
        let start = self.rope.line_to_char(line);
        let end = if line + 1 < self.rope.len_lines() {
            self.rope.line_to_char(line + 1) - 1
        } else {
            self.rope.len_chars()
        };
        end - start
    }

    fn scroll_offset_into_view(&mut self, offset: usize) {
        let position = self.offset_to_position(offset.min(self.rope.len_chars()));
        if self.is_position_visible(position) {
            return;
        }
        let half = self.viewport_height.unwrap_or(0) / 2;
        self.scroll_top = position
            .line
            .saturating_sub(half)
            .min(self.rope.len_lines().saturating_sub(1));
    }
}

impl TextEngine for RopeEngine {
    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_text(&self, line: usize) -> Option<String> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let mut text = self.rope.line(line).to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        Some(text)
    }

    fn line_range(&self, line: usize) -> Option<Range<usize>> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let start = self.rope.line_to_char(line);
        Some(start..start + self.line_len(line))
    }

    fn offset_to_position(&self, offset: usize) -> Position {
        let offset = offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        let column = (offset - self.rope.line_to_char(line)).min(self.line_len(line));
        Position::new(line, column)
    }

    fn position_to_offset(&self, position: Position) -> usize {
        if position.line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        self.rope.line_to_char(position.line) + position.column.min(self.line_len(position.line))
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.rope.len_chars());
    }

    fn selection(&self) -> Option<Range<usize>> {
        self.selection.clone()
    }

    fn set_selection(&mut self, range: Option<Range<usize>>) {
        self.selection = range;
        self.clamp_state();
    }

    fn viewport(&self) -> Viewport {
        let visible = self.visible_lines();
        let from = self.rope.line_to_char(visible.start);
        let last = visible.end.saturating_sub(1);
        let to = self.rope.line_to_char(last) + self.line_len(last);
        Viewport::new(from, to)
    }

    fn visible_lines(&self) -> Range<usize> {
        let total = self.rope.len_lines();
        let top = self.scroll_top.min(total.saturating_sub(1));
        let end = match self.viewport_height {
            Some(height) => (top + height).min(total),
            None => total,
        };
        top..end.max(top + 1)
    }

    fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    fn set_scroll_top(&mut self, line: usize) -> UpdateNotice {
        let before = self.viewport();
        self.scroll_top = line.min(self.rope.len_lines().saturating_sub(1));
        UpdateNotice {
            doc_changed: false,
            viewport_changed: self.viewport() != before,
        }
    }

    fn set_viewport_height(&mut self, lines: Option<usize>) -> UpdateNotice {
        let before = self.viewport();
        self.viewport_height = lines;
        UpdateNotice {
            doc_changed: false,
            viewport_changed: self.viewport() != before,
        }
    }

    fn is_position_visible(&self, position: Position) -> bool {
        self.visible_lines().contains(&position.line)
    }

    fn dispatch(&mut self, transaction: Transaction) -> UpdateNotice {
        let viewport_before = self.viewport();
        let mut doc_changed = false;

        for change in &transaction.changes {
            let len = self.rope.len_chars();
            let from = change.from.min(len);
            let to = change.to.min(len).max(from);
            if from == to && change.insert.is_empty() {
                continue;
            }
            self.rope.remove(from..to);
            self.rope.insert(from, &change.insert);
            doc_changed = true;
        }

        if doc_changed {
            // The highlight pass restarts from scratch on any edit.
            self.parsed_upto = 0;
            self.clamp_state();
        }

        for effect in &transaction.effects {
            match effect {
                Effect::ScrollIntoView { offset } => self.scroll_offset_into_view(*offset),
                Effect::ScrollToTop => self.scroll_top = 0,
                Effect::RestoreScroll(snapshot) => {
                    if self.restore_scroll(snapshot).is_err() {
                        log::debug!("ignoring unusable scroll snapshot; scrolling to top");
                        self.scroll_top = 0;
                    }
                }
            }
        }

        UpdateNotice {
            doc_changed,
            viewport_changed: self.viewport() != viewport_before,
        }
    }

    fn scroll_snapshot(&self) -> ScrollSnapshot {
        ScrollSnapshot::new(
            SnapshotRepr::Anchor {
                offset: self.rope.line_to_char(self.scroll_top),
            },
            self.fingerprint(),
        )
    }

    fn restore_scroll(&mut self, snapshot: &ScrollSnapshot) -> Result<UpdateNotice, EngineError> {
        let SnapshotRepr::Anchor { offset } = snapshot.repr else {
            return Err(EngineError::Unsupported("line/column scroll snapshot"));
        };
        if snapshot.fingerprint() != self.fingerprint() {
            return Err(EngineError::StaleSnapshot);
        }
        let before = self.viewport();
        self.scroll_top = self.rope.char_to_line(offset.min(self.rope.len_chars()));
        Ok(UpdateNotice {
            doc_changed: false,
            viewport_changed: self.viewport() != before,
        })
    }

    fn viewport_padding(&self) -> ViewportPadding {
        ViewportPadding::default()
    }

    fn fingerprint(&self) -> u64 {
        content_fingerprint(self.rope.chunks())
    }

    fn token_range_at(&self, offset: usize) -> Result<Range<usize>, EngineError> {
        let offset = offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        let line_start = self.rope.line_to_char(line);
        let column = offset - line_start;
        let text = self.line_text(line).unwrap_or_default();

        let mut seg_start = 0;
        for (_, word) in text.split_word_bound_indices() {
            let seg_len = word.chars().count();
            if column >= seg_start && column < seg_start + seg_len {
                return Ok(offset..line_start + seg_start + seg_len);
            }
            seg_start += seg_len;
        }
        Ok(offset..offset)
    }

    fn syntax_ready(&self, upto: usize) -> bool {
        self.parsed_upto >= upto.min(self.rope.len_chars())
    }

    fn ingest_parse_progress(&mut self, upto: usize) -> UpdateNotice {
        self.parsed_upto = upto.min(self.rope.len_chars());
        UpdateNotice::default()
    }
}
