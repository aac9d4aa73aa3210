//! Scroll-snapshot caching keyed by document identity.
//!
//! The facade displays many documents through one view. When a document is
//! swapped out its scroll position is remembered here, keyed by the
//! caller-supplied [`DocumentId`], and restored when the same document is
//! swapped back in. Snapshots are validated against document content at
//! restore time, so a stale entry degrades to scrolling to the top rather
//! than landing somewhere wrong.
//!
//! Saves are driven by scroll events through a [`Debouncer`]: a burst of
//! events produces one snapshot, captured a short delay after the burst
//! ends. The debouncer is polled with explicit instants, which keeps it
//! free of timers and trivially testable.

use crate::engine::ScrollSnapshot;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Delay between the last scroll event and the snapshot capture.
pub const SCROLL_SNAPSHOT_DELAY: Duration = Duration::from_millis(250);

/// Caller-supplied identity of a document shown in the view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Last-known scroll snapshot per document.
#[derive(Debug, Default)]
pub struct ScrollSnapshotCache {
    snapshots: HashMap<DocumentId, ScrollSnapshot>,
}

impl ScrollSnapshotCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot for `id`, superseding any previous one.
    pub fn save(&mut self, id: DocumentId, snapshot: ScrollSnapshot) {
        self.snapshots.insert(id, snapshot);
    }

    /// The cached snapshot for `id`, if any.
    pub fn get(&self, id: &DocumentId) -> Option<&ScrollSnapshot> {
        self.snapshots.get(id)
    }

    /// Forget the snapshot for `id`.
    pub fn remove(&mut self, id: &DocumentId) -> Option<ScrollSnapshot> {
        self.snapshots.remove(id)
    }

    /// Drop all cached snapshots.
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Number of cached snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Trailing-edge debouncer polled with explicit instants.
///
/// Each [`poke`](Self::poke) re-arms the deadline at `now + delay`;
/// [`fire`](Self::fire) reports `true` at most once per armed period, when
/// polled at or past the deadline.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Create a debouncer with the given trailing delay.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Record an event at `now`, pushing the deadline back.
    pub fn poke(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Poll at `now`. Returns `true` once the armed deadline has passed,
    /// then disarms.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Returns `true` while a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Drop any pending deadline without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(SCROLL_SNAPSHOT_DELAY)
    }
}
