//! Viewport-change tracking and rebuild scheduling.
//!
//! The tracker turns [`UpdateNotice`]s from the engine into rebuild
//! decisions. Any document or viewport change invalidates the whole derived
//! decoration state; there is no incremental path, rebuilds are full but
//! viewport-scoped and therefore cheap.
//!
//! It also tracks syntax readiness explicitly: while the background
//! highlight pass has not yet covered the viewport, position markers fall
//! back to character-offset placement, and the moment coverage catches up a
//! corrective rebuild upgrades them to token-accurate ranges.

use crate::engine::{TextEngine, UpdateNotice};

/// Why the last observed update needs (or does not need) a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    /// Nothing changed since the last rebuild.
    #[default]
    Idle,
    /// The visible range moved without a content change.
    ViewportChanged,
    /// The document content changed (possibly moving the viewport too).
    DocumentChanged,
}

/// Whether the syntax/highlight pass covers the current viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyntaxReadiness {
    /// The pass has not caught up with the viewport yet; token lookups are
    /// unreliable.
    #[default]
    Incomplete,
    /// The pass covers the viewport; token lookups are accurate.
    Complete,
}

/// Decides when derived decorations must be recomputed.
#[derive(Debug, Default)]
pub struct ViewportTracker {
    state: TrackerState,
    readiness: SyntaxReadiness,
    revision: u64,
}

impl ViewportTracker {
    /// Create a tracker in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold an engine update into the tracker.
    ///
    /// Returns `true` when a full rebuild is due: on any document or
    /// viewport change, and once more when syntax coverage first reaches
    /// the viewport after a document change.
    pub fn observe(&mut self, notice: UpdateNotice, engine: &dyn TextEngine) -> bool {
        if notice.doc_changed {
            self.state = TrackerState::DocumentChanged;
            self.revision += 1;
            self.readiness = SyntaxReadiness::Incomplete;
        } else if notice.viewport_changed {
            self.state = TrackerState::ViewportChanged;
        }

        let caught_up = engine.syntax_ready(engine.viewport().to);
        let upgraded = caught_up && self.readiness == SyntaxReadiness::Incomplete;
        if caught_up {
            self.readiness = SyntaxReadiness::Complete;
        }

        notice.any() || upgraded
    }

    /// Mark the pending change as handled.
    pub fn settle(&mut self) {
        self.state = TrackerState::Idle;
    }

    /// Current pending-change state.
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Returns `true` when token lookups are currently reliable.
    pub fn syntax_complete(&self) -> bool {
        self.readiness == SyntaxReadiness::Complete
    }

    /// Monotonic document revision, bumped on every content change.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
