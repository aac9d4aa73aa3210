//! Derived decorations and the builders that compute them.
//!
//! A [`Decoration`] is the concrete, range-bound visual effect derived from
//! a marker for the current viewport. Decorations are ephemeral: they are
//! recomputed from the marker registries whenever the viewport or the
//! document changes, and never mutated externally.
//!
//! The build functions here are pure. They receive a [`RebuildContext`]
//! (captured from the engine at build time) instead of reaching into any
//! view state, and they iterate only the lines intersecting the viewport —
//! never the whole document — which is what keeps multi-megabyte minified
//! bundles responsive.

use crate::engine::{TextEngine, Viewport};
use crate::marker::{GutterMarker, LineContentMarker, LineEntry, MarkerPosition, PositionContentMarker};
use crate::search::SearchOverlay;
use indexmap::IndexMap;
use std::ops::Range;

/// Reserved marker id owning search-highlight decorations, so clearing a
/// search removes them atomically without disturbing caller markers.
pub const SEARCH_MARKER_ID: &str = "search-highlight";

/// The visual effect a decoration applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationEffect {
    /// Class applied to a whole line.
    LineClass(String),
    /// Inline widget anchored at a line end, rendered after the caret.
    LineWidget {
        /// Line the widget belongs to.
        line: usize,
        /// Marker-supplied value for the widget factory.
        value: Option<String>,
        /// Render as a block element.
        render_as_block: bool,
    },
    /// Class applied to a character range.
    Mark(String),
    /// Widget anchored at a position, rendered after the caret.
    Widget {
        /// Line of the anchoring position.
        line: usize,
        /// Column of the anchoring position.
        column: usize,
    },
    /// Class applied to a line's gutter element.
    GutterClass(String),
    /// Widget rendered in a line's gutter.
    GutterWidget {
        /// Line the gutter entry belongs to.
        line: usize,
        /// Condition result handed to the widget factory.
        value: Option<String>,
    },
}

/// An immutable range-bound visual effect, tagged with the marker that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    /// Absolute character offset the decoration starts at.
    pub from: usize,
    /// Absolute character offset the decoration ends at.
    pub to: usize,
    /// Id of the owning marker.
    pub marker_id: String,
    /// The visual effect.
    pub effect: DecorationEffect,
}

impl Decoration {
    fn new(from: usize, to: usize, marker_id: &str, effect: DecorationEffect) -> Self {
        Self {
            from,
            to,
            marker_id: marker_id.to_string(),
            effect,
        }
    }
}

/// An ordered, coalesced collection of decorations, queryable by range and
/// filterable by marker id.
///
/// Decorations are grouped per marker; iteration is sorted by `from`, with
/// marker registration order breaking ties. Replacing a marker's
/// decorations is atomic: no observable state ever contains a mix of old
/// and new decorations for one marker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecorationSet {
    buckets: IndexMap<String, Vec<Decoration>>,
}

impl DecorationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace all decorations owned by `marker_id`.
    pub fn replace_marker(&mut self, marker_id: &str, mut decorations: Vec<Decoration>) {
        decorations.sort_by_key(|d| (d.from, d.to));
        if decorations.is_empty() {
            self.buckets.shift_remove(marker_id);
        } else {
            self.buckets.insert(marker_id.to_string(), decorations);
        }
    }

    /// Remove all decorations owned by `marker_id`. No-op if absent.
    pub fn remove_marker(&mut self, marker_id: &str) {
        self.buckets.shift_remove(marker_id);
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Total decoration count.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Returns `true` if the set holds no decorations.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Decorations owned by one marker, sorted by `from`.
    pub fn for_marker(&self, marker_id: &str) -> &[Decoration] {
        self.buckets.get(marker_id).map_or(&[], Vec::as_slice)
    }

    /// All decorations, sorted by `from`; ties keep marker insertion order.
    pub fn decorations(&self) -> Vec<&Decoration> {
        let mut all: Vec<(usize, &Decoration)> = self
            .buckets
            .values()
            .enumerate()
            .flat_map(|(bucket, items)| items.iter().map(move |d| (bucket, d)))
            .collect();
        all.sort_by_key(|(bucket, d)| (d.from, *bucket));
        all.into_iter().map(|(_, d)| d).collect()
    }

    /// Decorations intersecting `from..to`, in set order.
    ///
    /// Point decorations (`from == to`) are included when they sit inside
    /// the queried range (inclusive of both boundaries).
    pub fn query_range(&self, from: usize, to: usize) -> Vec<&Decoration> {
        self.decorations()
            .into_iter()
            .filter(|d| {
                if d.from == d.to {
                    d.from >= from && d.from <= to
                } else {
                    d.from < to && d.to > from
                }
            })
            .collect()
    }
}

/// Snapshot of the engine state a rebuild runs against.
///
/// Captured once per rebuild so every build function sees the same
/// viewport, and so markers stay plain value objects with no view
/// back-reference.
#[derive(Debug, Clone)]
pub struct RebuildContext {
    /// The rendered viewport, in character offsets.
    pub viewport: Viewport,
    /// Half-open range of visible line indices.
    pub lines: Range<usize>,
    /// Whether the syntax/highlight pass covers the viewport, gating
    /// token-accurate position markers.
    pub syntax_complete: bool,
}

impl RebuildContext {
    /// Capture the context for a rebuild from the engine.
    pub fn capture(engine: &dyn TextEngine, syntax_complete: bool) -> Self {
        Self {
            viewport: engine.viewport(),
            lines: engine.visible_lines(),
            syntax_complete,
        }
    }
}

/// Compute the decorations a line-content marker contributes to the
/// current viewport.
///
/// Only the lines intersecting the viewport are considered. With
/// `mark_all_lines` every visible line qualifies; otherwise only the
/// marker's explicit entries that fall inside the viewport. A marker with
/// neither a class nor a widget contributes nothing.
pub fn build_line_content(
    marker: &LineContentMarker,
    ctx: &RebuildContext,
    engine: &dyn TextEngine,
) -> Vec<Decoration> {
    let mut out = Vec::new();
    let entries: Vec<LineEntry> = if marker.mark_all_lines {
        ctx.lines.clone().map(LineEntry::new).collect()
    } else {
        marker.lines.clone()
    };

    for entry in entries {
        if !ctx.lines.contains(&entry.line) {
            continue;
        }
        let Some(range) = engine.line_range(entry.line) else {
            continue;
        };
        if let Some(class) = &marker.line_class_name {
            out.push(Decoration::new(
                range.start,
                range.end,
                &marker.id,
                DecorationEffect::LineClass(class.clone()),
            ));
        } else if marker.line_widget.is_some() {
            // Anchored at the line end so the widget follows the caret.
            out.push(Decoration::new(
                range.end,
                range.end,
                &marker.id,
                DecorationEffect::LineWidget {
                    line: entry.line,
                    value: entry.value,
                    render_as_block: marker.render_as_block,
                },
            ));
        }
    }
    out
}

/// Compute the decorations a position-content marker contributes to the
/// current viewport.
///
/// Line/column positions are translated to offsets no earlier than the
/// measured indentation of their line. Class decorations cover the token
/// found by a single forward lookup from the position when the syntax pass
/// has caught up, and fall back to a one-character range in the interim.
pub fn build_position_content(
    marker: &PositionContentMarker,
    ctx: &RebuildContext,
    engine: &dyn TextEngine,
) -> Vec<Decoration> {
    let mut out = Vec::new();

    for position in &marker.positions {
        match *position {
            MarkerPosition::Offsets { from, to } => {
                if !ctx.viewport.contains_range(from, to) {
                    continue;
                }
                if let Some(class) = &marker.position_class_name {
                    out.push(Decoration::new(
                        from,
                        to,
                        &marker.id,
                        DecorationEffect::Mark(class.clone()),
                    ));
                }
            }
            MarkerPosition::LineColumn { line, column } => {
                if !ctx.lines.contains(&line) {
                    continue;
                }
                let Some(range) = engine.line_range(line) else {
                    continue;
                };
                let text = engine.line_text(line).unwrap_or_default();
                let line_len = range.end - range.start;
                let indentation = text.chars().take_while(|c| c.is_whitespace()).count();
                let adjusted = column.max(indentation).min(line_len);
                let at = range.start + adjusted;

                if marker.position_widget.is_some() {
                    out.push(Decoration::new(
                        at,
                        at,
                        &marker.id,
                        DecorationEffect::Widget { line, column },
                    ));
                }
                if let Some(class) = &marker.position_class_name {
                    let token = if ctx.syntax_complete {
                        engine.token_range_at(at).ok()
                    } else {
                        None
                    };
                    let token = token.unwrap_or(at..(at + 1).min(range.end));
                    let base = column.min(line_len);
                    let token_text: String = text
                        .chars()
                        .skip(base)
                        .take((token.end - range.start).saturating_sub(base))
                        .collect();
                    // Ignore empty tokens and opening braces.
                    if token_text.is_empty() || token_text == "{" || token_text == "[" {
                        continue;
                    }
                    out.push(Decoration::new(
                        at,
                        token.end,
                        &marker.id,
                        DecorationEffect::Mark(class.clone()),
                    ));
                }
            }
        }
    }
    out
}

/// Compute the gutter decorations a marker contributes to the current
/// viewport.
///
/// The condition is evaluated for every visible line on every rebuild;
/// gutters have no narrower update path, they must track scrolling
/// exactly. A panicking condition propagates to the caller.
pub fn build_gutter(
    marker: &GutterMarker,
    ctx: &RebuildContext,
    engine: &dyn TextEngine,
) -> Vec<Decoration> {
    let Some(condition) = &marker.condition else {
        return Vec::new();
    };
    let mut out = Vec::new();

    for line in ctx.lines.clone() {
        let Some(result) = condition(line) else {
            continue;
        };
        let Some(range) = engine.line_range(line) else {
            continue;
        };
        if let Some(class) = &marker.line_class_name {
            out.push(Decoration::new(
                range.start,
                range.end,
                &marker.id,
                DecorationEffect::GutterClass(class.clone()),
            ));
        }
        if marker.gutter_widget.is_some() {
            out.push(Decoration::new(
                range.start,
                range.end,
                &marker.id,
                DecorationEffect::GutterWidget {
                    line,
                    value: Some(result),
                },
            ));
        }
    }
    out
}

/// Materialize search-match highlights for the portion of the match list
/// intersecting the viewport.
///
/// Matches live anywhere in the document; only their viewport intersection
/// becomes decorations, owned by [`SEARCH_MARKER_ID`].
pub fn build_search_highlights(overlay: &SearchOverlay, ctx: &RebuildContext) -> Vec<Decoration> {
    let Some(class) = overlay.class_name() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for m in overlay.cursors() {
        if !ctx.viewport.intersects(m.from, m.to) {
            continue;
        }
        let from = m.from.max(ctx.viewport.from);
        let to = m.to.min(ctx.viewport.to);
        if from < to {
            out.push(Decoration::new(
                from,
                to,
                SEARCH_MARKER_ID,
                DecorationEffect::Mark(class.to_string()),
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RopeEngine;
    use crate::engine::TextEngine;
    use pretty_assertions::assert_eq;

    fn ten_line_engine() -> RopeEngine {
        let text: Vec<String> = (0..10).map(|i| format!("line {i}")).collect();
        RopeEngine::new(&text.join("\n"))
    }

    fn ctx(engine: &dyn TextEngine) -> RebuildContext {
        RebuildContext::capture(engine, true)
    }

    #[test]
    fn test_replace_marker_is_atomic() {
        let mut set = DecorationSet::new();
        set.replace_marker(
            "x",
            vec![Decoration::new(0, 5, "x", DecorationEffect::Mark("a".into()))],
        );
        set.replace_marker(
            "x",
            vec![Decoration::new(7, 9, "x", DecorationEffect::Mark("b".into()))],
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.for_marker("x")[0].from, 7);
    }

    #[test]
    fn test_tie_break_keeps_marker_order() {
        let mut set = DecorationSet::new();
        set.replace_marker(
            "first",
            vec![Decoration::new(4, 4, "first", DecorationEffect::Mark("a".into()))],
        );
        set.replace_marker(
            "second",
            vec![Decoration::new(4, 4, "second", DecorationEffect::Mark("b".into()))],
        );
        // A targeted rebuild of the earlier marker must not demote it.
        set.replace_marker(
            "first",
            vec![Decoration::new(4, 4, "first", DecorationEffect::Mark("a2".into()))],
        );

        let ids: Vec<&str> = set.decorations().iter().map(|d| d.marker_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_query_range_includes_point_decorations() {
        let mut set = DecorationSet::new();
        set.replace_marker(
            "w",
            vec![Decoration::new(
                10,
                10,
                "w",
                DecorationEffect::Widget { line: 1, column: 3 },
            )],
        );
        assert_eq!(set.query_range(0, 10).len(), 1);
        assert_eq!(set.query_range(11, 20).len(), 0);
    }

    #[test]
    fn test_line_content_respects_viewport() {
        let mut engine = ten_line_engine();
        engine.set_viewport_height(Some(3));
        engine.set_scroll_top(2);

        let marker = crate::LineContentMarker::new("hl")
            .with_class("highlight")
            .with_lines(vec![
                crate::LineEntry::new(0),
                crate::LineEntry::new(3),
                crate::LineEntry::new(9),
            ]);
        let decorations = build_line_content(&marker, &ctx(&engine), &engine);
        assert_eq!(decorations.len(), 1);
        assert_eq!(decorations[0].from, engine.line_range(3).unwrap().start);
    }

    #[test]
    fn test_mark_all_lines_covers_every_visible_line() {
        let mut engine = ten_line_engine();
        engine.set_viewport_height(Some(4));
        engine.set_scroll_top(5);

        let marker = crate::LineContentMarker::new("all")
            .with_class("blackboxed")
            .mark_all_lines();
        let decorations = build_line_content(&marker, &ctx(&engine), &engine);
        assert_eq!(decorations.len(), 4);
    }

    #[test]
    fn test_marker_without_effects_contributes_nothing() {
        let engine = ten_line_engine();
        let marker = crate::LineContentMarker::new("empty")
            .with_lines(vec![crate::LineEntry::new(1)]);
        assert!(build_line_content(&marker, &ctx(&engine), &engine).is_empty());
    }

    #[test]
    fn test_position_marker_skips_offscreen_positions() {
        let mut engine = ten_line_engine();
        engine.set_viewport_height(Some(3));
        engine.set_scroll_top(0);

        let marker = crate::PositionContentMarker::new("bp")
            .with_positions(vec![
                crate::MarkerPosition::LineColumn { line: 1, column: 5 },
                crate::MarkerPosition::LineColumn { line: 8, column: 0 },
            ])
            .with_widget(std::rc::Rc::new(|_| crate::WidgetNode::new("span", "bp")));
        let decorations = build_position_content(&marker, &ctx(&engine), &engine);
        assert_eq!(decorations.len(), 1);
        let expected = engine.line_range(1).unwrap().start + 5;
        assert_eq!(decorations[0].from, expected);
        assert_eq!(decorations[0].to, expected);
    }

    #[test]
    fn test_position_marker_measures_indentation() {
        let engine = RopeEngine::new("    indented line");
        let marker = crate::PositionContentMarker::new("bp")
            .with_positions(vec![crate::MarkerPosition::LineColumn { line: 0, column: 1 }])
            .with_widget(std::rc::Rc::new(|_| crate::WidgetNode::new("span", "bp")));
        let decorations = build_position_content(&marker, &ctx(&engine), &engine);
        // Column 1 sits inside the leading whitespace; the decoration lands
        // after it.
        assert_eq!(decorations[0].from, 4);
    }

    #[test]
    fn test_position_class_skips_opening_braces() {
        let engine = RopeEngine::new("{\nvalue");
        let marker = crate::PositionContentMarker::new("dbg")
            .with_positions(vec![
                crate::MarkerPosition::LineColumn { line: 0, column: 0 },
                crate::MarkerPosition::LineColumn { line: 1, column: 0 },
            ])
            .with_class("debug-position");
        let decorations = build_position_content(&marker, &ctx(&engine), &engine);
        assert_eq!(decorations.len(), 1);
        assert_eq!(decorations[0].from, 2);
        assert_eq!(decorations[0].to, 7);
    }

    #[test]
    fn test_position_class_falls_back_before_syntax_ready() {
        let engine = RopeEngine::new("value");
        let ctx = RebuildContext::capture(&engine, false);
        let marker = crate::PositionContentMarker::new("dbg")
            .with_positions(vec![crate::MarkerPosition::LineColumn { line: 0, column: 0 }])
            .with_class("debug-position");
        let decorations = build_position_content(&marker, &ctx, &engine);
        assert_eq!(decorations.len(), 1);
        // Character-offset-only placement: a single-character range.
        assert_eq!((decorations[0].from, decorations[0].to), (0, 1));
    }

    #[test]
    fn test_gutter_condition_panic_propagates() {
        let engine = ten_line_engine();
        let marker = crate::GutterMarker::new(
            "boom",
            std::rc::Rc::new(|line| {
                if line == 0 {
                    panic!("condition failure")
                } else {
                    None
                }
            }),
        )
        .with_class("x");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            build_gutter(&marker, &ctx(&engine), &engine)
        }));
        assert!(result.is_err());
    }
}
