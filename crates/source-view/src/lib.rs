#![warn(missing_docs)]
//! Source View - Headless Source-Editor Decoration & Viewport Engine
//!
//! # Overview
//!
//! `source-view` is a headless decoration and viewport engine for read-mostly
//! source displays (debugger-style source panes). It manages markers,
//! viewport-scoped decoration rebuilds, search-match navigation, and
//! per-document scroll restoration over one of two pluggable text engines.
//! It does not render; the upper layer consumes decorations and widget
//! descriptions and paints them however it likes.
//!
//! # Core Features
//!
//! - **Declarative Markers**: line-content, position-content, and gutter
//!   marker rules, keyed by caller-supplied ids
//! - **Viewport-Scoped Rebuilds**: decorations are recomputed only for the
//!   visible range, never the whole document
//! - **Search Overlay**: regex search with a wrap-around cursor list and
//!   viewport-clipped highlights
//! - **Scroll Restoration**: debounced per-document scroll snapshots,
//!   validated against content before restore
//! - **Engine Abstraction**: one [`TextEngine`] contract over a rope-backed
//!   engine and a line-buffer engine
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  EditorFacade (markers, search, scrolling)  │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Decoration Builders (viewport-scoped)      │  ← Derived State
//! ├─────────────────────────────────────────────┤
//! │  ViewportTracker (rebuild scheduling)       │  ← Change Tracking
//! ├─────────────────────────────────────────────┤
//! │  TextEngine trait                           │  ← Engine Contract
//! ├─────────────────────────────────────────────┤
//! │  RopeEngine / LineBufferEngine              │  ← Text Backends
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use source_view::{EditorFacade, LineContentMarker, LineEntry, RopeEngine, TextEngine};
//!
//! let mut engine = RopeEngine::new("fn main() {\n    println!(\"Hello\");\n}\n");
//! engine.ingest_parse_progress(engine.len_chars());
//! let mut editor = EditorFacade::new(Box::new(engine));
//!
//! editor
//!     .set_line_content_marker(
//!         LineContentMarker::new("paused-line")
//!             .with_class("paused")
//!             .with_lines(vec![LineEntry::new(1)]),
//!     )
//!     .unwrap();
//!
//! assert_eq!(editor.decorations().len(), 1);
//! ```
//!
//! # Module Description
//!
//! - [`engine`] - the [`TextEngine`] contract and transaction vocabulary
//! - [`rope_engine`] - rope-backed engine with token lookup
//! - [`line_engine`] - line-buffer engine with horizontal scrolling
//! - [`marker`] - marker rules, validation, and registries
//! - [`decoration`] - derived decorations and their builders
//! - [`viewport`] - rebuild scheduling and syntax readiness
//! - [`search`] - search overlay with wrap-around navigation
//! - [`scroll`] - per-document snapshot cache and debouncing
//! - [`facade`] - the unified editor API
//!
//! # Unicode Support
//!
//! - UTF-8 internal encoding; all public offsets are character offsets
//! - Proper handling of CJK double-width characters in horizontal
//!   visibility checks
//! - Token lookup respects Unicode word boundaries

pub mod decoration;
pub mod engine;
pub mod facade;
pub mod line_engine;
pub mod marker;
pub mod rope_engine;
pub mod scroll;
pub mod search;
pub mod viewport;

pub use decoration::{
    Decoration, DecorationEffect, DecorationSet, RebuildContext, SEARCH_MARKER_ID,
};
pub use engine::{
    Change, Effect, EngineError, Position, ScrollSnapshot, TextEngine, Transaction, UpdateNotice,
    Viewport, ViewportPadding,
};
pub use facade::{DomEventHandler, EditorEvent, EditorFacade, ViewportLocations};
pub use line_engine::LineBufferEngine;
pub use marker::{
    GutterCondition, GutterMarker, LineContentMarker, LineEntry, MarkerError, MarkerPosition,
    MarkerRegistry, MarkerRule, PositionContentMarker, WidgetContext, WidgetFactory, WidgetNode,
};
pub use rope_engine::RopeEngine;
pub use scroll::{Debouncer, DocumentId, SCROLL_SNAPSHOT_DELAY, ScrollSnapshotCache};
pub use search::{MatchRange, SearchError, SearchOptions, SearchOverlay, find_all};
pub use viewport::{SyntaxReadiness, TrackerState, ViewportTracker};
