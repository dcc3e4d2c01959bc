// ── Domain model ──

pub mod connectivity;
pub mod notification;
pub mod snapshot;

pub use connectivity::{Connectivity, LinkMode};
pub use notification::{Notification, NotificationLevel};
pub use snapshot::{SENSOR_COUNT, SnapshotSource, StatusSnapshot};
