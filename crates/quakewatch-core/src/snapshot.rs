//! Shared in-memory snapshot of the latest processed events.
//!
//! [`SnapshotStore`] holds an [`Arc<Snapshot>`] behind a read-write lock.
//! The lock only guards the pointer: readers clone the `Arc` and release
//! the lock immediately, the poller swaps in a freshly built snapshot.
//! Readers therefore see either the previous cycle or the new one, never
//! a mix, and filtering or serialization never holds the lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use quakewatch_types::ProcessedEvent;
use tokio::sync::RwLock;

/// An immutable, point-in-time set of processed events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Events in the order the poller produced them.
    pub events: Vec<ProcessedEvent>,
    /// Poll cycle that produced this snapshot (0 before the first poll).
    pub cycle: u64,
    /// When the poller published this snapshot.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Number of events in the snapshot.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the snapshot holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Single-writer, many-reader holder of the current [`Snapshot`].
///
/// Cheap to clone; clones share the same underlying snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    current: Arc<RwLock<Arc<Snapshot>>>,
}

impl SnapshotStore {
    /// Create a store holding an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the current snapshot.
    ///
    /// The returned `Arc` stays valid and unchanged even if the poller
    /// publishes a new snapshot afterwards.
    pub async fn load(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Replace the current snapshot with `events` for `cycle`.
    ///
    /// Returns the number of events published.
    pub async fn publish(&self, events: Vec<ProcessedEvent>, cycle: u64) -> usize {
        let next = Arc::new(Snapshot {
            events,
            cycle,
            updated_at: Some(Utc::now()),
        });
        let count = next.len();
        *self.current.write().await = next;
        count
    }
}
