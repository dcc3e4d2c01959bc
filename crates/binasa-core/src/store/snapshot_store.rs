// ── Current snapshot holder ──
//
// Exactly one snapshot is current at a time. Each update replaces it
// wholesale; readers hold `Arc`s to immutable values.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::time::Instant;

use crate::model::{SnapshotSource, StatusSnapshot};
use crate::stream::SnapshotStream;

/// Result of offering a snapshot to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The snapshot is now current.
    Applied(Arc<StatusSnapshot>),
    /// A fetched snapshot lost to a push snapshot that arrived after the
    /// fetch was issued.
    Stale,
}

impl IngestOutcome {
    pub fn applied(&self) -> Option<&Arc<StatusSnapshot>> {
        match self {
            Self::Applied(snap) => Some(snap),
            Self::Stale => None,
        }
    }
}

/// Reactive holder for the current [`StatusSnapshot`].
pub struct SnapshotStore {
    current: watch::Sender<Option<Arc<StatusSnapshot>>>,
    /// When the most recent push snapshot was applied.
    last_push: Mutex<Option<Instant>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            last_push: Mutex::new(None),
        }
    }

    /// The current snapshot, if one has been received.
    pub fn current(&self) -> Option<Arc<StatusSnapshot>> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.current.subscribe())
    }

    /// Replace the current snapshot.
    ///
    /// `requested_at` is when the data was asked for (poll and re-sync) or
    /// when it arrived (push). Push snapshots always apply. A fetched
    /// snapshot whose request predates the last applied push snapshot is
    /// dropped, so a slow poll cannot roll the display back.
    pub(crate) fn apply(&self, snapshot: StatusSnapshot, requested_at: Instant) -> IngestOutcome {
        let mut last_push = self.last_push.lock().unwrap_or_else(PoisonError::into_inner);

        if snapshot.source == SnapshotSource::Push {
            *last_push = Some(requested_at);
        } else if last_push.is_some_and(|pushed| requested_at < pushed) {
            tracing::debug!(source = %snapshot.source, "discarding stale snapshot");
            return IngestOutcome::Stale;
        }

        let snapshot = Arc::new(snapshot);
        self.current.send_replace(Some(Arc::clone(&snapshot)));
        IngestOutcome::Applied(snapshot)
    }
}
