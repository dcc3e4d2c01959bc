// binasa-core: Realtime state synchronization between the pump controller and consumers (CLI).

pub mod command;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod model;
pub mod store;
pub mod stream;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{AutoConfirm, CommandOutcome, Confirmation, PendingCommand};
pub use config::DashboardConfig;
pub use controller::Controller;
pub use device::DeviceApi;
pub use error::CoreError;
pub use store::{IngestOutcome, SnapshotStore};
pub use stream::{SnapshotStream, SnapshotWatchStream};

pub use model::{
    Connectivity, LinkMode, Notification, NotificationLevel, SnapshotSource, StatusSnapshot,
};

// Wire types consumers need alongside the engine.
pub use binasa_api::{Backoff, HistoryPoint, PumpAction, PushState};
