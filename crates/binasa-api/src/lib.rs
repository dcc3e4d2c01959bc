// binasa-api: Async Rust client for the BinasaMan pump controller (HTTP + push stream)

pub mod client;
pub mod error;
pub mod models;
pub mod transport;
pub mod websocket;

pub use client::{DeviceClient, push_url_for};
pub use error::Error;
pub use models::{ControlReply, ControlRequest, HistoryPoint, PumpAction, StatusPayload};
pub use transport::TransportConfig;
pub use websocket::{Backoff, PushConfig, PushEvent, PushSource, PushState};
