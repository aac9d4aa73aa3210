//! The editor facade: one stable API over either text engine.
//!
//! [`EditorFacade`] owns the engine, the three marker registries, the
//! derived [`DecorationSet`], the search overlay, and the per-document
//! scroll-snapshot cache. Callers talk to the facade only; the concrete
//! engine is chosen once at construction and never branched on afterwards.
//!
//! Every mutation funnels through one dispatch path: apply the transaction,
//! fold the engine's update notice into the viewport tracker, and rebuild
//! the decoration set in full when the tracker says so. Decorations are
//! never edited incrementally.

use crate::decoration::{
    DecorationSet, RebuildContext, SEARCH_MARKER_ID, build_gutter, build_line_content,
    build_position_content, build_search_highlights,
};
use crate::engine::{
    Effect, Position, ScrollSnapshot, TextEngine, Transaction, UpdateNotice, Viewport,
};
use crate::marker::{
    GutterMarker, LineContentMarker, MarkerError, MarkerRegistry, MarkerRule,
    PositionContentMarker, WidgetContext, WidgetNode,
};
use crate::scroll::{Debouncer, DocumentId, ScrollSnapshotCache};
use crate::search::{MatchRange, SearchError, SearchOptions, SearchOverlay};
use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;
use std::time::Instant;

/// A DOM-style event delivered to registered handlers, with the cursor
/// position at delivery time.
#[derive(Debug, Clone)]
pub struct EditorEvent {
    /// Event kind, e.g. `"click"` or `"keydown"`.
    pub kind: String,
    /// Cursor position when the event fired.
    pub position: Position,
}

/// Handler invoked when a subscribed event kind fires.
pub type DomEventHandler = Rc<dyn Fn(&EditorEvent)>;

/// The padded line/column region callers should treat as "on screen".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportLocations {
    /// First padded position.
    pub start: Position,
    /// Last padded position.
    pub end: Position,
}

/// Facade over a text engine, marker registries, derived decorations,
/// search state, and scroll restoration.
pub struct EditorFacade {
    engine: Box<dyn TextEngine>,
    line_markers: MarkerRegistry<LineContentMarker>,
    position_markers: MarkerRegistry<PositionContentMarker>,
    gutter_markers: MarkerRegistry<GutterMarker>,
    decorations: DecorationSet,
    tracker: crate::viewport::ViewportTracker,
    search: SearchOverlay,
    scroll_cache: ScrollSnapshotCache,
    scroll_debounce: Debouncer,
    current_document: Option<DocumentId>,
    dom_handlers: HashMap<String, Vec<DomEventHandler>>,
}

impl EditorFacade {
    /// Create a facade over the given engine.
    pub fn new(engine: Box<dyn TextEngine>) -> Self {
        Self {
            engine,
            line_markers: MarkerRegistry::new(),
            position_markers: MarkerRegistry::new(),
            gutter_markers: MarkerRegistry::new(),
            decorations: DecorationSet::new(),
            tracker: crate::viewport::ViewportTracker::new(),
            search: SearchOverlay::new(),
            scroll_cache: ScrollSnapshotCache::new(),
            scroll_debounce: Debouncer::default(),
            current_document: None,
            dom_handlers: HashMap::new(),
        }
    }

    // ---- document content -------------------------------------------------

    /// Full document text.
    pub fn text(&self) -> String {
        self.engine.text()
    }

    /// Total line count.
    pub fn line_count(&self) -> usize {
        self.engine.line_count()
    }

    /// Text of one line, without its trailing newline.
    pub fn line_text(&self, line: usize) -> Option<String> {
        self.engine.line_text(line)
    }

    /// Cursor position, as line/column.
    pub fn cursor_position(&self) -> Position {
        self.engine.offset_to_position(self.engine.cursor())
    }

    /// Current selection, as a character-offset range.
    pub fn selection(&self) -> Option<Range<usize>> {
        self.engine.selection()
    }

    /// Text covered by the current selection.
    pub fn selection_text(&self) -> Option<String> {
        let range = self.engine.selection()?;
        let text: String = self
            .engine
            .text()
            .chars()
            .skip(range.start)
            .take(range.end - range.start)
            .collect();
        Some(text)
    }

    /// Replace the whole document, optionally identifying it for scroll
    /// restoration.
    ///
    /// Installing content and restoring scroll are two separate
    /// transactions: the restore effect must only ever run against the new
    /// content. A cached snapshot is used when its content fingerprint
    /// matches the incoming text; otherwise the view scrolls to the top.
    pub fn set_text(&mut self, text: &str, document: Option<DocumentId>) {
        if self.engine.text() == text {
            self.current_document = document;
            return;
        }

        let len = self.engine.len_chars();
        self.dispatch(Transaction::change(0, len, text));

        let restore = document
            .as_ref()
            .and_then(|id| self.scroll_cache.get(id))
            .filter(|snapshot| snapshot.fingerprint() == self.engine.fingerprint())
            .cloned();
        match restore {
            Some(snapshot) => self.dispatch(Transaction::effect(Effect::RestoreScroll(snapshot))),
            None => {
                if document.is_some() {
                    log::debug!("no usable scroll snapshot; scrolling to top");
                }
                self.dispatch(Transaction::effect(Effect::ScrollToTop));
            }
        }
        self.current_document = document;
    }

    /// Apply an atomic batch of changes and effects.
    pub fn apply(&mut self, transaction: Transaction) {
        self.dispatch(transaction);
    }

    /// Clear the document and all derived state.
    pub fn reset(&mut self) {
        let len = self.engine.len_chars();
        self.line_markers.clear();
        self.position_markers.clear();
        self.gutter_markers.clear();
        self.search.clear();
        self.decorations.clear();
        self.scroll_cache.clear();
        self.scroll_debounce.cancel();
        self.current_document = None;
        self.dispatch(Transaction::change(0, len, ""));
    }

    // ---- markers ----------------------------------------------------------

    /// Register or replace a line-content marker and rebuild its
    /// decorations.
    pub fn set_line_content_marker(&mut self, marker: LineContentMarker) -> Result<(), MarkerError> {
        let id = marker.id.clone();
        self.line_markers.set(marker)?;
        self.rebuild_line_marker(&id);
        Ok(())
    }

    /// Remove a line-content marker and its decorations. No-op if absent.
    pub fn remove_line_content_marker(&mut self, id: &str) {
        self.line_markers.remove(id);
        self.decorations.remove_marker(id);
    }

    /// Register or replace a position-content marker and rebuild its
    /// decorations.
    pub fn set_position_content_marker(
        &mut self,
        marker: PositionContentMarker,
    ) -> Result<(), MarkerError> {
        let id = marker.id.clone();
        self.position_markers.set(marker)?;
        self.rebuild_position_marker(&id);
        Ok(())
    }

    /// Remove a position-content marker and its decorations. No-op if
    /// absent.
    pub fn remove_position_content_marker(&mut self, id: &str) {
        self.position_markers.remove(id);
        self.decorations.remove_marker(id);
    }

    /// Register gutter markers in bulk, or re-evaluate the cached set.
    ///
    /// With `Some`, every marker is validated before any is applied, so a
    /// bad batch changes nothing. With `None`, the conditions of all
    /// already-registered markers are re-evaluated against the current
    /// viewport; a no-op when none are registered.
    pub fn set_line_gutter_markers(
        &mut self,
        markers: Option<Vec<GutterMarker>>,
    ) -> Result<(), MarkerError> {
        match markers {
            Some(markers) => {
                for marker in &markers {
                    marker.validate()?;
                }
                for marker in markers {
                    let id = marker.id.clone();
                    self.gutter_markers.set(marker)?;
                    self.rebuild_gutter_marker(&id);
                }
            }
            None => {
                let ids: Vec<String> =
                    self.gutter_markers.markers().map(|m| m.id.clone()).collect();
                for id in ids {
                    self.rebuild_gutter_marker(&id);
                }
            }
        }
        Ok(())
    }

    /// Remove a gutter marker and its decorations. No-op if absent.
    pub fn remove_line_gutter_marker(&mut self, id: &str) {
        self.gutter_markers.remove(id);
        self.decorations.remove_marker(id);
    }

    // ---- decorations ------------------------------------------------------

    /// The current decoration set.
    pub fn decoration_set(&self) -> &DecorationSet {
        &self.decorations
    }

    /// All current decorations, sorted by start offset; markers registered
    /// earlier win ties.
    pub fn decorations(&self) -> Vec<&crate::decoration::Decoration> {
        self.decorations.decorations()
    }

    /// Realize every widget decoration through its marker's factory.
    ///
    /// A decoration whose marker or factory has gone missing yields a
    /// fallback node rather than failing the whole render.
    pub fn widgets(&self) -> Vec<WidgetNode> {
        use crate::decoration::DecorationEffect;
        let mut out = Vec::new();
        for decoration in self.decorations.decorations() {
            let (context, factory) = match &decoration.effect {
                DecorationEffect::LineWidget { line, value, .. } => (
                    WidgetContext {
                        line: *line,
                        column: None,
                        value: value.clone(),
                    },
                    self.line_markers
                        .get(&decoration.marker_id)
                        .and_then(|m| m.line_widget.clone()),
                ),
                DecorationEffect::Widget { line, column } => (
                    WidgetContext {
                        line: *line,
                        column: Some(*column),
                        value: None,
                    },
                    self.position_markers
                        .get(&decoration.marker_id)
                        .and_then(|m| m.position_widget.clone()),
                ),
                DecorationEffect::GutterWidget { line, value } => (
                    WidgetContext {
                        line: *line,
                        column: None,
                        value: value.clone(),
                    },
                    self.gutter_markers
                        .get(&decoration.marker_id)
                        .and_then(|m| m.gutter_widget.clone()),
                ),
                _ => continue,
            };
            match factory {
                Some(factory) => out.push(factory(&context)),
                None => {
                    log::warn!(
                        "no widget factory for marker `{}`; rendering fallback",
                        decoration.marker_id
                    );
                    out.push(WidgetNode::fallback());
                }
            }
        }
        out
    }

    // ---- viewport and scrolling -------------------------------------------

    /// The rendered viewport, in character offsets.
    pub fn viewport(&self) -> Viewport {
        self.engine.viewport()
    }

    /// Set the viewport height in lines. `None` renders the whole document.
    pub fn set_viewport_height(&mut self, lines: Option<usize>) {
        let notice = self.engine.set_viewport_height(lines);
        self.after_update(notice);
    }

    /// The padded line/column region callers should treat as visible.
    ///
    /// The engine's padding widens the range so just-offscreen data is
    /// fetched before it scrolls in.
    pub fn get_locations_in_viewport(&self) -> ViewportLocations {
        let padding = self.engine.viewport_padding();
        let lines = self.engine.visible_lines();
        let last_line = self.engine.line_count().saturating_sub(1);

        let start_line = lines.start.saturating_sub(padding.lines);
        let end_line = lines.end.saturating_sub(1).saturating_add(padding.lines).min(last_line);

        let (start_column, end_column) = match self.engine.horizontal_span() {
            Some(span) => (
                span.start.saturating_sub(padding.columns),
                span.end + padding.columns,
            ),
            None => {
                let end_len = self
                    .engine
                    .line_range(end_line)
                    .map_or(0, |range| range.end - range.start);
                (0, end_len)
            }
        };

        ViewportLocations {
            start: Position::new(start_line, start_column),
            end: Position::new(end_line, end_column),
        }
    }

    /// Scroll a line/column position into view.
    ///
    /// `(0, 0)` jumps straight to the top; a position already on screen is
    /// left alone; anything else is centered.
    pub fn scroll_to(&mut self, line: usize, column: usize) {
        if line == 0 && column == 0 {
            self.dispatch(Transaction::effect(Effect::ScrollToTop));
            return;
        }
        let position = Position::new(line, column);
        if self.engine.is_position_visible(position) {
            return;
        }
        let offset = self.engine.position_to_offset(position);
        self.dispatch(Transaction::effect(Effect::ScrollIntoView { offset }));
    }

    /// Scroll a character offset into view, centered unless already
    /// visible.
    pub fn scroll_to_position(&mut self, offset: usize) {
        self.dispatch(Transaction::effect(Effect::ScrollIntoView { offset }));
    }

    /// Scroll so `line` is the first visible line, as a user scroll event
    /// at `now` (arms the snapshot debouncer).
    pub fn scroll_viewport(&mut self, line: usize, now: Instant) {
        let notice = self.engine.set_scroll_top(line);
        self.after_update(notice);
        self.scroll_debounce.poke(now);
    }

    /// Record a raw scroll event at `now` without moving the viewport
    /// (e.g. sub-line pixel scrolling handled by the host).
    pub fn on_scroll(&mut self, now: Instant) {
        self.scroll_debounce.poke(now);
    }

    /// Poll the snapshot debouncer at `now`.
    ///
    /// Once a scroll burst has settled, captures one snapshot for the
    /// current document, superseding any previous one.
    pub fn tick(&mut self, now: Instant) {
        if self.scroll_debounce.fire(now) {
            if let Some(id) = self.current_document.clone() {
                self.scroll_cache.save(id, self.engine.scroll_snapshot());
            }
        }
    }

    /// Capture the current scroll state.
    pub fn scroll_snapshot(&self) -> ScrollSnapshot {
        self.engine.scroll_snapshot()
    }

    /// Record that the background parse now covers the document up to
    /// `upto`; triggers a corrective rebuild when coverage first reaches
    /// the viewport.
    pub fn ingest_parse_progress(&mut self, upto: usize) {
        let notice = self.engine.ingest_parse_progress(upto);
        self.after_update(notice);
    }

    // ---- search -----------------------------------------------------------

    /// Highlight every match of `query` and make the first one current.
    ///
    /// Returns the match count. Search highlights live under their own
    /// reserved marker id, so caller markers are untouched.
    pub fn highlight_search_matches(
        &mut self,
        query: &str,
        options: SearchOptions,
        class_name: &str,
    ) -> Result<usize, SearchError> {
        let text = self.engine.text();
        let count = self.search.highlight(&text, query, options, class_name)?;
        let ctx = self.context();
        let highlights = build_search_highlights(&self.search, &ctx);
        self.decorations.replace_marker(SEARCH_MARKER_ID, highlights);
        Ok(count)
    }

    /// Remove all search highlights and navigation state. Idempotent.
    pub fn clear_search_matches(&mut self) {
        self.search.clear();
        self.decorations.remove_marker(SEARCH_MARKER_ID);
    }

    /// Step to the next (or previous) search match, wrapping around, and
    /// bring it on screen selected.
    pub fn next_search_cursor(&mut self, reverse: bool) -> Option<MatchRange> {
        let m = self.search.next_cursor(reverse)?.clone();
        self.engine.set_selection(Some(m.from..m.to));
        self.dispatch(Transaction::effect(Effect::ScrollIntoView { offset: m.from }));
        Some(m)
    }

    /// Index of the current search match.
    pub fn current_search_index(&self) -> Option<usize> {
        self.search.current_index()
    }

    /// All search matches, in document order.
    pub fn search_cursors(&self) -> &[MatchRange] {
        self.search.cursors()
    }

    // ---- DOM events -------------------------------------------------------

    /// Subscribe a handler to an event kind.
    pub fn add_editor_dom_event_listener(&mut self, kind: &str, handler: DomEventHandler) {
        self.dom_handlers
            .entry(kind.to_string())
            .or_default()
            .push(handler);
    }

    /// Subscribe a batch of handlers, keyed by event kind.
    pub fn add_editor_dom_event_listeners(
        &mut self,
        handlers: HashMap<String, Vec<DomEventHandler>>,
    ) {
        for (kind, batch) in handlers {
            self.dom_handlers.entry(kind).or_default().extend(batch);
        }
    }

    /// Unsubscribe a batch of handlers, keyed by event kind.
    pub fn remove_editor_dom_event_listeners(
        &mut self,
        handlers: &HashMap<String, Vec<DomEventHandler>>,
    ) {
        for (kind, batch) in handlers {
            for handler in batch {
                self.remove_editor_dom_event_listener(kind, handler);
            }
        }
    }

    /// Unsubscribe a previously added handler (matched by identity).
    pub fn remove_editor_dom_event_listener(&mut self, kind: &str, handler: &DomEventHandler) {
        if let Some(handlers) = self.dom_handlers.get_mut(kind) {
            handlers.retain(|h| !Rc::ptr_eq(h, handler));
            if handlers.is_empty() {
                self.dom_handlers.remove(kind);
            }
        }
    }

    /// Deliver an event of `kind` to its subscribed handlers, with the
    /// cursor position at delivery time.
    pub fn fire_dom_event(&self, kind: &str) {
        let Some(handlers) = self.dom_handlers.get(kind) else {
            return;
        };
        let event = EditorEvent {
            kind: kind.to_string(),
            position: self.cursor_position(),
        };
        for handler in handlers {
            handler(&event);
        }
    }

    // ---- internals --------------------------------------------------------

    fn dispatch(&mut self, transaction: Transaction) {
        let notice = self.engine.dispatch(transaction);
        self.after_update(notice);
    }

    fn after_update(&mut self, notice: UpdateNotice) {
        if self.tracker.observe(notice, self.engine.as_ref()) {
            self.rebuild_all();
        }
        self.tracker.settle();
    }

    fn context(&self) -> RebuildContext {
        RebuildContext::capture(self.engine.as_ref(), self.tracker.syntax_complete())
    }

    fn rebuild_all(&mut self) {
        let ctx = self.context();
        let engine = self.engine.as_ref();

        for marker in self.line_markers.markers() {
            let decs = build_line_content(marker, &ctx, engine);
            self.decorations.replace_marker(&marker.id, decs);
        }
        for marker in self.position_markers.markers() {
            let decs = build_position_content(marker, &ctx, engine);
            self.decorations.replace_marker(&marker.id, decs);
        }
        for marker in self.gutter_markers.markers() {
            let decs = build_gutter(marker, &ctx, engine);
            self.decorations.replace_marker(&marker.id, decs);
        }
        if self.search.is_active() {
            let highlights = build_search_highlights(&self.search, &ctx);
            self.decorations.replace_marker(SEARCH_MARKER_ID, highlights);
        }
    }

    fn rebuild_line_marker(&mut self, id: &str) {
        let ctx = self.context();
        let decs = match self.line_markers.get(id) {
            Some(marker) => build_line_content(marker, &ctx, self.engine.as_ref()),
            None => return,
        };
        self.decorations.replace_marker(id, decs);
    }

    fn rebuild_position_marker(&mut self, id: &str) {
        let ctx = self.context();
        let decs = match self.position_markers.get(id) {
            Some(marker) => build_position_content(marker, &ctx, self.engine.as_ref()),
            None => return,
        };
        self.decorations.replace_marker(id, decs);
    }

    fn rebuild_gutter_marker(&mut self, id: &str) {
        let ctx = self.context();
        let decs = match self.gutter_markers.get(id) {
            Some(marker) => build_gutter(marker, &ctx, self.engine.as_ref()),
            None => return,
        };
        self.decorations.replace_marker(id, decs);
    }
}

impl std::fmt::Debug for EditorFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorFacade")
            .field("line_markers", &self.line_markers.len())
            .field("position_markers", &self.position_markers.len())
            .field("gutter_markers", &self.gutter_markers.len())
            .field("decorations", &self.decorations.len())
            .field("current_document", &self.current_document)
            .finish()
    }
}
