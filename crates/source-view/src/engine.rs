//! Text engine adapter contract.
//!
//! The editor facade runs on top of one of two incompatible text-rendering
//! engines. This module defines the uniform [`TextEngine`] capability trait
//! both engines implement, plus the transaction vocabulary shared across the
//! crate:
//!
//! - [`Transaction`] — an atomic batch of text [`Change`]s and scroll
//!   [`Effect`]s, applied in one call
//! - [`UpdateNotice`] — what a dispatch reports back (`doc_changed`,
//!   `viewport_changed`; both may be set at once, e.g. for a large paste)
//! - [`Viewport`] — the currently rendered sub-range of the document, in
//!   character offsets
//! - [`ScrollSnapshot`] — an opaque saved scroll position, valid only
//!   against the exact document content it was captured from
//!
//! The engine is selected once at facade construction; no caller branches on
//! the concrete engine afterwards.

use std::cmp::Ordering;
use std::hash::{DefaultHasher, Hasher};
use std::ops::Range;
use thiserror::Error;

/// Position coordinates (line and column numbers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Zero-based logical line index.
    pub line: usize,
    /// Zero-based column in characters within the logical line.
    pub column: usize,
}

impl Position {
    /// Create a new logical position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The currently rendered sub-range of the document, in character offsets.
///
/// Independent of the total document length; changes on scroll, resize, or
/// edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Start offset of the first visible line (inclusive).
    pub from: usize,
    /// End offset of the last visible line (inclusive boundary).
    pub to: usize,
}

impl Viewport {
    /// Create a new viewport range.
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// Returns `true` if `from..to` lies entirely within this viewport.
    pub fn contains_range(&self, from: usize, to: usize) -> bool {
        from >= self.from && to <= self.to
    }

    /// Returns `true` if `from..to` overlaps this viewport at all.
    pub fn intersects(&self, from: usize, to: usize) -> bool {
        from <= self.to && to >= self.from
    }
}

/// One atomic text replacement, in character offsets.
///
/// An insertion has `from == to`; a deletion has an empty `insert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Start offset of the replaced range.
    pub from: usize,
    /// End offset of the replaced range (exclusive).
    pub to: usize,
    /// Replacement text.
    pub insert: String,
}

/// A scroll-related effect carried by a [`Transaction`].
#[derive(Debug, Clone)]
pub enum Effect {
    /// Scroll the given offset into view, centered, unless already visible.
    ScrollIntoView {
        /// Character offset to reveal.
        offset: usize,
    },
    /// Restore a previously captured scroll snapshot.
    ///
    /// Only valid against the exact document content the snapshot was
    /// captured from; the facade sequences content installation and scroll
    /// restoration into separate transactions to guarantee this.
    RestoreScroll(ScrollSnapshot),
    /// Scroll to the top of the document.
    ScrollToTop,
}

/// An atomic batch of changes and effects, applied in one dispatch.
///
/// Changes apply sequentially; each change's offsets refer to the document
/// as it stands when that change is applied.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    /// Text changes to apply, in order.
    pub changes: Vec<Change>,
    /// Scroll effects to apply after the changes.
    pub effects: Vec<Effect>,
}

impl Transaction {
    /// A transaction carrying a single text change.
    pub fn change(from: usize, to: usize, insert: impl Into<String>) -> Self {
        Self {
            changes: vec![Change {
                from,
                to,
                insert: insert.into(),
            }],
            effects: Vec::new(),
        }
    }

    /// A transaction carrying a single effect and no changes.
    pub fn effect(effect: Effect) -> Self {
        Self {
            changes: Vec::new(),
            effects: vec![effect],
        }
    }
}

/// What a dispatched transaction reported back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateNotice {
    /// The document content changed.
    pub doc_changed: bool,
    /// The visible range changed (scroll, resize, or offsets shifted by an
    /// edit).
    pub viewport_changed: bool,
}

impl UpdateNotice {
    /// Returns `true` if either flag is set.
    pub fn any(&self) -> bool {
        self.doc_changed || self.viewport_changed
    }
}

/// Engine-specific safety margin applied when reporting viewport locations,
/// so callers can pre-fetch just-offscreen data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewportPadding {
    /// Extra lines above and below the visible range.
    pub lines: usize,
    /// Extra columns left and right of the visible span.
    pub columns: usize,
}

/// Opaque engine-specific scroll state.
///
/// Carries a fingerprint of the document content it was captured from;
/// restoring against different content fails with
/// [`EngineError::StaleSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollSnapshot {
    pub(crate) repr: SnapshotRepr,
    fingerprint: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SnapshotRepr {
    /// Line/column scroll state (line-buffer engine).
    LineColumn { top_line: usize, left_column: usize },
    /// Anchor-offset scroll state (rope engine).
    Anchor { offset: usize },
}

impl ScrollSnapshot {
    pub(crate) fn new(repr: SnapshotRepr, fingerprint: u64) -> Self {
        Self { repr, fingerprint }
    }

    /// Fingerprint of the document content this snapshot was captured from.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

/// Hash a document's full text into a content fingerprint.
pub(crate) fn content_fingerprint<'a, I>(chunks: I) -> u64
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = DefaultHasher::new();
    // Raw writes keep the hash independent of chunk boundaries, so a rope
    // and a contiguous string produce the same fingerprint for equal text.
    for chunk in chunks {
        hasher.write(chunk.as_bytes());
    }
    hasher.finish()
}

/// Engine adapter errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// An adapter hook was invoked without a concrete implementation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// A scroll snapshot was restored against a document it was not
    /// captured from.
    #[error("scroll snapshot does not match the current document")]
    StaleSnapshot,
}

/// Uniform capability contract over a concrete text-rendering engine.
///
/// All offsets are character offsets; all line/column coordinates are
/// zero-based. Implementations keep cursor, selection, and scroll state
/// clamped to the document at all times.
pub trait TextEngine {
    /// Full document text.
    fn text(&self) -> String;

    /// Total character count.
    fn len_chars(&self) -> usize;

    /// Total line count.
    fn line_count(&self) -> usize;

    /// Text of the given line, without its trailing newline.
    fn line_text(&self, line: usize) -> Option<String>;

    /// Character-offset range of the given line, excluding the newline.
    fn line_range(&self, line: usize) -> Option<Range<usize>>;

    /// Convert a character offset to a line/column position.
    fn offset_to_position(&self, offset: usize) -> Position;

    /// Convert a line/column position to a character offset, clamped to the
    /// line length.
    fn position_to_offset(&self, position: Position) -> usize;

    /// Primary cursor offset.
    fn cursor(&self) -> usize;

    /// Move the primary cursor (clamped to the document).
    fn set_cursor(&mut self, offset: usize);

    /// Current selection range, if non-empty.
    fn selection(&self) -> Option<Range<usize>>;

    /// Replace the selection range.
    fn set_selection(&mut self, range: Option<Range<usize>>);

    /// The rendered viewport, in character offsets.
    fn viewport(&self) -> Viewport;

    /// Half-open range of visible line indices.
    fn visible_lines(&self) -> Range<usize>;

    /// First visible line index.
    fn scroll_top(&self) -> usize;

    /// Scroll so `line` is the first visible line.
    fn set_scroll_top(&mut self, line: usize) -> UpdateNotice;

    /// Set the viewport height in lines. `None` renders the whole document.
    fn set_viewport_height(&mut self, lines: Option<usize>) -> UpdateNotice;

    /// Returns `true` if the position is currently rendered on screen.
    fn is_position_visible(&self, position: Position) -> bool;

    /// Apply an atomic batch of changes and effects.
    fn dispatch(&mut self, transaction: Transaction) -> UpdateNotice;

    /// Capture the current scroll state.
    fn scroll_snapshot(&self) -> ScrollSnapshot;

    /// Restore a previously captured scroll state.
    ///
    /// Fails with [`EngineError::StaleSnapshot`] when the snapshot was
    /// captured from different document content, and with
    /// [`EngineError::Unsupported`] when the snapshot came from a different
    /// engine variant.
    fn restore_scroll(&mut self, snapshot: &ScrollSnapshot) -> Result<UpdateNotice, EngineError>;

    /// Safety margin this engine applies when reporting viewport locations.
    fn viewport_padding(&self) -> ViewportPadding;

    /// Visible column span, for engines that scroll horizontally.
    ///
    /// `None` means the engine renders full lines regardless of horizontal
    /// scroll.
    fn horizontal_span(&self) -> Option<Range<usize>> {
        None
    }

    /// Content fingerprint of the current document.
    fn fingerprint(&self) -> u64;

    /// Character range of the syntax token at `offset`, discovered via a
    /// single forward lookup.
    ///
    /// The default signals a missing backend-specific override.
    fn token_range_at(&self, _offset: usize) -> Result<Range<usize>, EngineError> {
        Err(EngineError::Unsupported("token_range_at"))
    }

    /// Returns `true` when the syntax/highlight pass covers the document up
    /// to `upto`.
    fn syntax_ready(&self, _upto: usize) -> bool {
        true
    }

    /// Record that the background parse now covers the document up to
    /// `upto`.
    fn ingest_parse_progress(&mut self, _upto: usize) -> UpdateNotice {
        UpdateNotice::default()
    }
}
