//! Line-buffer engine (legacy variant).
//!
//! Backs the [`TextEngine`] contract with plain per-line string storage and
//! line/column scroll state, including a horizontal column scroll. Visual
//! column measurement is Unicode-width aware, so wide (CJK) characters count
//! as two cells when deciding whether a position is on screen.

use crate::engine::{
    Change, Effect, EngineError, Position, ScrollSnapshot, SnapshotRepr, TextEngine, Transaction,
    UpdateNotice, Viewport, ViewportPadding, content_fingerprint,
};
use std::ops::Range;
use unicode_width::UnicodeWidthChar;

/// Allowance of lines offscreen reported to callers pre-fetching data.
const PADDING_LINES: usize = 20;
/// Allowance of columns offscreen reported to callers pre-fetching data.
const PADDING_COLUMNS: usize = 100;

/// Default viewport height used until the host reports one.
const DEFAULT_VIEWPORT_HEIGHT: Option<usize> = None;

/// A [`TextEngine`] backed by a vector of lines.
pub struct LineBufferEngine {
    lines: Vec<String>,
    /// Character offset of each line start.
    line_starts: Vec<usize>,
    len_chars: usize,
    cursor: usize,
    selection: Option<Range<usize>>,
    scroll_top: usize,
    left_column: usize,
    viewport_height: Option<usize>,
    viewport_width: usize,
}

impl LineBufferEngine {
    /// Create an engine over `text` with a viewport `width` in columns.
    pub fn new(text: &str, width: usize) -> Self {
        let mut engine = Self {
            lines: Vec::new(),
            line_starts: Vec::new(),
            len_chars: 0,
            cursor: 0,
            selection: None,
            scroll_top: 0,
            left_column: 0,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            viewport_width: width,
        };
        engine.set_content(text);
        engine
    }

    /// Create an engine over an empty document.
    pub fn empty(width: usize) -> Self {
        Self::new("", width)
    }

    /// Scroll horizontally so `column` is the leftmost visible column.
    pub fn set_scroll_left(&mut self, column: usize) {
        self.left_column = column;
    }

    fn set_content(&mut self, text: &str) {
        self.lines = text.split('\n').map(str::to_string).collect();
        self.reindex();
        self.clamp_state();
    }

    fn reindex(&mut self) {
        self.line_starts.clear();
        let mut start = 0;
        for line in &self.lines {
            self.line_starts.push(start);
            start += line.chars().count() + 1;
        }
        self.len_chars = start.saturating_sub(1);
    }

    fn clamp_state(&mut self) {
        self.cursor = self.cursor.min(self.len_chars);
        if let Some(range) = self.selection.take() {
            let start = range.start.min(self.len_chars);
            let end = range.end.min(self.len_chars);
            if start < end {
                self.selection = Some(start..end);
            }
        }
        self.scroll_top = self.scroll_top.min(self.lines.len().saturating_sub(1));
    }

    fn line_len(&self, line: usize) -> usize {
        self.lines[line].chars().count()
    }

    /// Visual x (in cells) of `column` within `line`, measured per character.
    fn visual_x(&self, line: usize, column: usize) -> usize {
        self.lines[line]
            .chars()
            .take(column)
            .map(|ch| ch.width().unwrap_or(1))
            .sum()
    }

    fn scroll_offset_into_view(&mut self, offset: usize) {
        let position = self.offset_to_position(offset.min(self.len_chars));
        if self.is_position_visible(position) {
            return;
        }
        let half = self.viewport_height.unwrap_or(0) / 2;
        self.scroll_top = position
            .line
            .saturating_sub(half)
            .min(self.lines.len().saturating_sub(1));

        let vx = self.visual_x(position.line, position.column);
        if vx < self.left_column || vx >= self.left_column + self.viewport_width {
            self.left_column = vx.saturating_sub(self.viewport_width / 2);
        }
    }

    fn apply_change(&mut self, change: &Change) {
        let mut text = self.text();
        let from = char_to_byte(&text, change.from.min(self.len_chars));
        let to = char_to_byte(&text, change.to.min(self.len_chars));
        text.replace_range(from.min(to)..to.max(from), &change.insert);
        self.set_content(&text);
    }
}

fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

impl TextEngine for LineBufferEngine {
    fn text(&self) -> String {
        self.lines.join("\n")
    }

    fn len_chars(&self) -> usize {
        self.len_chars
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_text(&self, line: usize) -> Option<String> {
        self.lines.get(line).cloned()
    }

    fn line_range(&self, line: usize) -> Option<Range<usize>> {
        let start = *self.line_starts.get(line)?;
        Some(start..start + self.line_len(line))
    }

    fn offset_to_position(&self, offset: usize) -> Position {
        let offset = offset.min(self.len_chars);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let column = (offset - self.line_starts[line]).min(self.line_len(line));
        Position::new(line, column)
    }

    fn position_to_offset(&self, position: Position) -> usize {
        if position.line >= self.lines.len() {
            return self.len_chars;
        }
        self.line_starts[position.line] + position.column.min(self.line_len(position.line))
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.len_chars);
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
        let from = self.line_starts[visible.start];
        let last = visible.end.saturating_sub(1);
        let to = self.line_starts[last] + self.line_len(last);
        Viewport::new(from, to)
    }

    fn visible_lines(&self) -> Range<usize> {
        let top = self.scroll_top.min(self.lines.len().saturating_sub(1));
        let end = match self.viewport_height {
            Some(height) => (top + height).min(self.lines.len()),
            None => self.lines.len(),
        };
        top..end.max(top + 1)
    }

    fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    fn set_scroll_top(&mut self, line: usize) -> UpdateNotice {
        let before = self.viewport();
        self.scroll_top = line.min(self.lines.len().saturating_sub(1));
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
        if !self.visible_lines().contains(&position.line) {
            return false;
        }
        let vx = self.visual_x(position.line, position.column.min(self.line_len(position.line)));
        vx >= self.left_column && vx < self.left_column + self.viewport_width
    }

    fn dispatch(&mut self, transaction: Transaction) -> UpdateNotice {
        let viewport_before = self.viewport();
        let mut doc_changed = false;

        for change in &transaction.changes {
            if change.from == change.to && change.insert.is_empty() {
                continue;
            }
            self.apply_change(change);
            doc_changed = true;
        }

        for effect in &transaction.effects {
            match effect {
                Effect::ScrollIntoView { offset } => self.scroll_offset_into_view(*offset),
                Effect::ScrollToTop => {
                    self.scroll_top = 0;
                    self.left_column = 0;
                }
                Effect::RestoreScroll(snapshot) => {
                    if self.restore_scroll(snapshot).is_err() {
                        log::debug!("ignoring unusable scroll snapshot; scrolling to top");
                        self.scroll_top = 0;
                        self.left_column = 0;
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
            SnapshotRepr::LineColumn {
                top_line: self.scroll_top,
                left_column: self.left_column,
            },
            self.fingerprint(),
        )
    }

    fn restore_scroll(&mut self, snapshot: &ScrollSnapshot) -> Result<UpdateNotice, EngineError> {
        let SnapshotRepr::LineColumn {
            top_line,
            left_column,
        } = snapshot.repr
        else {
            return Err(EngineError::Unsupported("anchor scroll snapshot"));
        };
        if snapshot.fingerprint() != self.fingerprint() {
            return Err(EngineError::StaleSnapshot);
        }
        let before = self.viewport();
        self.scroll_top = top_line.min(self.lines.len().saturating_sub(1));
        self.left_column = left_column;
        Ok(UpdateNotice {
            doc_changed: false,
            viewport_changed: self.viewport() != before,
        })
    }

    fn viewport_padding(&self) -> ViewportPadding {
        ViewportPadding {
            lines: PADDING_LINES,
            columns: PADDING_COLUMNS,
        }
    }

    fn horizontal_span(&self) -> Option<Range<usize>> {
        Some(self.left_column..self.left_column + self.viewport_width)
    }

    fn fingerprint(&self) -> u64 {
        let text = self.text();
        content_fingerprint([text.as_str()])
    }
}
