use thiserror::Error;

/// Top-level error type for the `binasa-api` crate.
///
/// Covers every failure mode of the device's surfaces: HTTP transport,
/// non-success replies, device-reported errors, malformed documents and the
/// push stream. `binasa-core` maps these into dashboard-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request or connect attempt timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Building the HTTP client failed (TLS backend, invalid settings).
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Device replies ──────────────────────────────────────────────
    /// The device answered with a non-success status code.
    ///
    /// `message` carries the body's `message` field when the device sent one.
    #[error("Device returned HTTP {status}")]
    Http { status: u16, message: Option<String> },

    /// The device accepted the request but reported an `{ "error": ... }`.
    #[error("Device error: {message}")]
    Device { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Push stream ─────────────────────────────────────────────────
    /// Push stream connection failed.
    #[error("Push stream connection failed: {0}")]
    WebSocketConnect(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::WebSocketConnect(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The most specific operator-facing message the device supplied, if any.
    pub fn device_message(&self) -> Option<&str> {
        let message = match self {
            Self::Device { message } => Some(message.as_str()),
            Self::Http { message, .. } => message.as_deref(),
            _ => None,
        };
        message.map(str::trim).filter(|m| !m.is_empty())
    }
}
