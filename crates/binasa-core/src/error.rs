// ── Core error types ──
//
// Dashboard-level errors from binasa-core. Consumers never match on HTTP
// transport details; the `From<binasa_api::Error>` impl folds them into
// domain variants.

use binasa_api::PumpAction;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach device at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Device request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The device answered but refused or failed the request.
    #[error("Device error: {message}")]
    DeviceError {
        status: Option<u16>,
        message: String,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed status payload: {message}")]
    Parse { message: String },

    #[error("No status snapshot available yet")]
    NoSnapshot,

    // ── Command errors ───────────────────────────────────────────────
    #[error("A pump command ({action}) is already pending since {since}")]
    CommandPending {
        action: PumpAction,
        since: DateTime<Utc>,
    },

    #[error("Pump command '{action}' failed: {message}")]
    CommandRejected { action: PumpAction, message: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Dashboard controller is already running")]
    AlreadyRunning,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for failures the next poll or reconnect may clear on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::Timeout { .. }
                | Self::DeviceError {
                    status: Some(500..),
                    ..
                }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<binasa_api::Error> for CoreError {
    fn from(err: binasa_api::Error) -> Self {
        match err {
            binasa_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                }
            }
            binasa_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            binasa_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            binasa_api::Error::ClientBuild(message) => CoreError::Config { message },
            binasa_api::Error::Http { status, message } => CoreError::DeviceError {
                status: Some(status),
                message: message.unwrap_or_else(|| format!("HTTP {status}")),
            },
            binasa_api::Error::Device { message } => CoreError::DeviceError {
                status: None,
                message,
            },
            binasa_api::Error::Deserialization { message, body } => {
                tracing::debug!(body = %body, "rejected payload");
                CoreError::Parse { message }
            }
            binasa_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_refusal_keeps_message() {
        let err: CoreError = binasa_api::Error::Device {
            message: "busy".into(),
        }
        .into();
        assert!(matches!(
            err,
            CoreError::DeviceError { status: None, ref message } if message == "busy"
        ));
    }

    #[test]
    fn http_error_without_body_gets_status_message() {
        let err: CoreError = binasa_api::Error::Http {
            status: 503,
            message: None,
        }
        .into();
        assert_eq!(err.to_string(), "Device error: HTTP 503");
        assert!(err.is_transient());
    }

    #[test]
    fn bad_payload_maps_to_parse() {
        let err: CoreError = binasa_api::Error::Deserialization {
            message: "expected a JSON object".into(),
            body: "[]".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Parse { .. }));
        assert!(!err.is_transient());
    }
}
