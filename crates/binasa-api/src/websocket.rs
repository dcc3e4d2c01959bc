//! Push stream with auto-reconnect.
//!
//! Connects to the device's push endpoint (`ws://host:81/` on current
//! firmware) and forwards every status document it broadcasts through a
//! [`tokio::sync::broadcast`] channel. A single background task owns the
//! connection, so at most one socket exists at a time. When the socket
//! closes or a connect attempt fails, the task waits out the [`Backoff`]
//! delay and tries again, forever, until cancelled.
//!
//! # Example
//!
//! ```rust,ignore
//! use binasa_api::websocket::{PushConfig, PushEvent, PushSource};
//! use tokio_util::sync::CancellationToken;
//!
//! let source = PushSource::new(PushConfig::new("ws://192.168.4.1:81/".parse()?));
//! let mut rx = source.subscribe();
//! source.start(CancellationToken::new());
//!
//! while let Ok(event) = rx.recv().await {
//!     if let PushEvent::SnapshotReceived(payload) = event {
//!         println!("level = {:?}", payload.level);
//!     }
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use strum::Display;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::models::StatusPayload;

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── PushState ────────────────────────────────────────────────────────

/// Lifecycle of the push connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PushState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    /// The socket dropped and a reconnect is scheduled.
    ClosedPendingRetry,
}

impl PushState {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

// ── PushEvent ────────────────────────────────────────────────────────

/// Everything the push source reports to its subscribers.
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// A well-formed status document arrived.
    SnapshotReceived(Arc<StatusPayload>),
    /// The connection moved to a new state.
    ConnectivityChanged(PushState),
}

// ── Backoff ──────────────────────────────────────────────────────────

/// Delay policy between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every attempt.
    Fixed(Duration),
    /// `initial * 2^attempt`, capped at `max`.
    Exponential { initial: Duration, max: Duration },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(3))
    }
}

impl Backoff {
    /// Delay before reconnect attempt number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { initial, max } => initial
                .saturating_mul(2_u32.saturating_pow(attempt))
                .min(max),
        }
    }
}

// ── PushConfig ───────────────────────────────────────────────────────

/// Settings for a [`PushSource`].
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub url: Url,
    pub backoff: Backoff,
    /// Upper bound on the TCP + websocket handshake.
    pub connect_timeout: Duration,
}

impl PushConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            backoff: Backoff::default(),
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

// ── PushSource ───────────────────────────────────────────────────────

/// Handle to the push connection and its background task.
///
/// Create it, subscribe, then [`start`](Self::start). Cancelling the token
/// passed to `start` tears the connection down and parks the state at
/// [`PushState::Disconnected`].
pub struct PushSource {
    config: PushConfig,
    event_tx: broadcast::Sender<PushEvent>,
    state_tx: Arc<watch::Sender<PushState>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PushSource {
    pub fn new(config: PushConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, _) = watch::channel(PushState::Disconnected);
        Self {
            config,
            event_tx,
            state_tx: Arc::new(state_tx),
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PushConfig {
        &self.config
    }

    /// Get a new receiver for push events.
    ///
    /// A receiver that falls behind gets [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.event_tx.subscribe()
    }

    /// Watch the connection state.
    pub fn state(&self) -> watch::Receiver<PushState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> PushState {
        *self.state_tx.borrow()
    }

    /// Spawn the connection task.
    ///
    /// Returns `false` without spawning if a task is already running.
    pub fn start(&self, cancel: CancellationToken) -> bool {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::warn!("Push source already running");
            return false;
        }

        let config = self.config.clone();
        let event_tx = self.event_tx.clone();
        let state_tx = Arc::clone(&self.state_tx);
        *task = Some(tokio::spawn(async move {
            push_loop(config, event_tx, state_tx, cancel).await;
        }));
        true
    }

    /// Wait for the background task to exit after cancellation.
    pub async fn join(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Push task ended abnormally");
            }
        }
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// How a connected session ended.
enum SessionEnd {
    /// Closed by the peer or the network; reconnect.
    Closed,
    /// The cancellation token fired.
    Cancelled,
}

/// Main loop: connect → read → on close or failure, wait → reconnect.
async fn push_loop(
    config: PushConfig,
    event_tx: broadcast::Sender<PushEvent>,
    state_tx: Arc<watch::Sender<PushState>>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        transition(&state_tx, &event_tx, PushState::Connecting);

        match connect_and_read(&config, &event_tx, &state_tx, &cancel).await {
            Ok(SessionEnd::Cancelled) => break,
            Ok(SessionEnd::Closed) => {
                tracing::info!("Push stream closed");
                attempt = 0;
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "Push stream connect failed");
            }
        }

        if cancel.is_cancelled() {
            break;
        }

        transition(&state_tx, &event_tx, PushState::ClosedPendingRetry);

        let delay = config.backoff.delay(attempt);
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "Waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        attempt = attempt.saturating_add(1);
    }

    transition(&state_tx, &event_tx, PushState::Disconnected);
    tracing::debug!("Push loop exiting");
}

/// Publish a state change. Repeated states are not re-announced.
fn transition(
    state_tx: &watch::Sender<PushState>,
    event_tx: &broadcast::Sender<PushEvent>,
    next: PushState,
) {
    let previous = state_tx.send_replace(next);
    if previous != next {
        tracing::debug!(from = %previous, to = %next, "Push state changed");
        // No subscribers is fine.
        let _ = event_tx.send(PushEvent::ConnectivityChanged(next));
    }
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Open one connection and read frames until it drops.
///
/// An `Err` means the connection never opened.
async fn connect_and_read(
    config: &PushConfig,
    event_tx: &broadcast::Sender<PushEvent>,
    state_tx: &watch::Sender<PushState>,
    cancel: &CancellationToken,
) -> Result<SessionEnd, Error> {
    tracing::info!(url = %config.url, "Connecting to push stream");

    let connect = tokio::time::timeout(
        config.connect_timeout,
        tokio_tungstenite::connect_async(config.url.as_str()),
    );

    let (mut ws, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
        result = connect => match result {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
            Err(_) => return Err(Error::Timeout {
                timeout_secs: config.connect_timeout.as_secs(),
            }),
        },
    };

    tracing::info!("Push stream connected");
    transition(state_tx, event_tx, PushState::Open);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                if let Err(e) = ws.close(None).await {
                    tracing::debug!(error = %e, "Push stream close handshake failed");
                }
                return Ok(SessionEnd::Cancelled);
            }
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    parse_and_broadcast(text.as_str(), event_tx);
                }
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => {
                        parse_and_broadcast(text, event_tx);
                    }
                    Err(_) => tracing::warn!(len = bytes.len(), "Dropping non-UTF-8 push frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    if let Some(cf) = frame {
                        tracing::info!(code = %cf.code, reason = %cf.reason, "Push close frame received");
                    } else {
                        tracing::info!("Push close frame received (no payload)");
                    }
                    return Ok(SessionEnd::Closed);
                }
                Some(Ok(_)) => {
                    // Ping/Pong; tungstenite answers pings itself
                    tracing::trace!("Push control frame");
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Push stream read error");
                    return Ok(SessionEnd::Closed);
                }
                None => {
                    tracing::info!("Push stream ended");
                    return Ok(SessionEnd::Closed);
                }
            },
        }
    }
}

// ── Message parsing ──────────────────────────────────────────────────

/// Parse one frame and broadcast it. Malformed frames are logged and
/// dropped. Returns whether a snapshot was forwarded.
fn parse_and_broadcast(text: &str, event_tx: &broadcast::Sender<PushEvent>) -> bool {
    match StatusPayload::from_json(text) {
        Ok(payload) => {
            tracing::debug!("Push snapshot received");
            let _ = event_tx.send(PushEvent::SnapshotReceived(Arc::new(payload)));
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed push frame");
            false
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
