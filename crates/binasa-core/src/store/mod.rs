// ── Reactive snapshot store ──
//
// Holds the single current snapshot and fans replacements out to
// subscribers via a `watch` channel.

mod snapshot_store;

pub use snapshot_store::{IngestOutcome, SnapshotStore};
