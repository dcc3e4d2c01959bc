// ── Reactive snapshot stream ──
//
// Subscription type for consuming snapshot replacements from the store.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::StatusSnapshot;

type Slot = Option<Arc<StatusSnapshot>>;

/// A subscription to the current status snapshot.
///
/// Provides point-in-time access and change notification via
/// [`changed`](Self::changed) or by converting to a `Stream`.
pub struct SnapshotStream {
    current: Slot,
    receiver: watch::Receiver<Slot>,
}

impl SnapshotStream {
    pub(crate) fn new(mut receiver: watch::Receiver<Slot>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The snapshot seen at creation or at the last `changed()`.
    pub fn current(&self) -> Option<&Arc<StatusSnapshot>> {
        self.current.as_ref()
    }

    /// Wait for the next replacement.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<StatusSnapshot>> {
        loop {
            self.receiver.changed().await.ok()?;
            let snap = self.receiver.borrow_and_update().clone();
            if let Some(snap) = snap {
                self.current = Some(Arc::clone(&snap));
                return Some(snap);
            }
        }
    }

    /// Wait until a snapshot satisfies `predicate`, checking the latest one
    /// first.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&StatusSnapshot) -> bool,
    ) -> Option<Arc<StatusSnapshot>> {
        let found = self
            .receiver
            .wait_for(|slot| slot.as_deref().is_some_and(&mut predicate))
            .await
            .ok()?
            .clone();
        self.current.clone_from(&found);
        found
    }

    /// Convert into a `Stream` yielding every snapshot, starting with the
    /// current one if present.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SnapshotWatchStream {
    inner: WatchStream<Slot>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<StatusSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(None)) => {}
                Poll::Ready(Some(Some(snap))) => return Poll::Ready(Some(snap)),
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use binasa_api::StatusPayload;
    use chrono::Utc;
    use futures_util::{FutureExt, StreamExt};
    use serde_json::json;

    use super::*;
    use crate::model::SnapshotSource;

    fn snapshot(level: u8) -> Arc<StatusSnapshot> {
        let payload = StatusPayload::from_value(json!({ "level": level })).unwrap();
        Arc::new(StatusSnapshot::from_payload(
            &payload,
            SnapshotSource::Push,
            Utc::now(),
        ))
    }

    #[tokio::test]
    async fn stream_skips_empty_slot_and_yields_replacements() {
        let (tx, rx) = watch::channel(None);
        let mut stream = SnapshotStream::new(rx).into_stream();

        // Nothing ingested yet: the initial empty slot is not an item.
        assert!(stream.next().now_or_never().is_none());

        tx.send_replace(Some(snapshot(20)));
        assert_eq!(stream.next().await.unwrap().water_level_percent, 20);

        tx.send_replace(Some(snapshot(45)));
        assert_eq!(stream.next().await.unwrap().water_level_percent, 45);

        drop(tx);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_starts_with_current_snapshot() {
        let (tx, rx) = watch::channel(Some(snapshot(70)));
        let stream = SnapshotStream::new(rx);
        assert_eq!(stream.current().unwrap().water_level_percent, 70);

        let mut stream = stream.into_stream();
        assert_eq!(stream.next().await.unwrap().water_level_percent, 70);
        drop(tx);
        assert!(stream.next().await.is_none());
    }
}
