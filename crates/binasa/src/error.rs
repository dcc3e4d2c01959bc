//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use binasa_config::ConfigError;
use binasa_core::{CoreError, PumpAction};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the pump controller at {url}")]
    #[diagnostic(
        code(binasa::connection_failed),
        help(
            "Check that the controller is powered and on the same network.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(binasa::timeout),
        help("Increase the timeout with --timeout or check the device's Wi-Fi signal.")
    )]
    Timeout { seconds: u64 },

    // ── Device ───────────────────────────────────────────────────────
    #[error("Device error: {message}")]
    #[diagnostic(code(binasa::device_error))]
    DeviceError { message: String },

    #[error("Device sent a malformed status: {message}")]
    #[diagnostic(
        code(binasa::malformed_status),
        help("The firmware may be incompatible with this CLI version.")
    )]
    MalformedStatus { message: String },

    #[error("No status received from the device yet")]
    #[diagnostic(
        code(binasa::no_snapshot),
        help("Run: binasa status to check that the device answers.")
    )]
    NoSnapshot,

    // ── Pump commands ────────────────────────────────────────────────
    #[error("A pump command ({action}) is still waiting for the device")]
    #[diagnostic(
        code(binasa::command_pending),
        help("Wait for the current command to finish before sending another.")
    )]
    CommandPending { action: PumpAction },

    #[error("Could not switch the pump {action}: {message}")]
    #[diagnostic(code(binasa::command_rejected))]
    CommandRejected { action: PumpAction, message: String },

    #[error("Pump did not report '{action}' within {seconds}s")]
    #[diagnostic(
        code(binasa::unconfirmed),
        help(
            "The device accepted the command but no status confirmed it.\n\
             Run: binasa status"
        )
    )]
    Unconfirmed { action: PumpAction, seconds: u64 },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(binasa::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(binasa::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: binasa config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No pump controller configured")]
    #[diagnostic(
        code(binasa::no_config),
        help(
            "Create a profile with: binasa config init\n\
             Or pass --device / set BINASA_DEVICE.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(binasa::config))]
    Config(String),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Switching the pump {action} requires confirmation")]
    #[diagnostic(
        code(binasa::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: PumpAction },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(binasa::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } | Self::Unconfirmed { .. } => exit_code::TIMEOUT,
            Self::CommandPending { .. } => exit_code::CONFLICT,
            Self::ProfileNotFound { .. } | Self::NoConfig { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::DeviceError { message, .. } => Self::DeviceError { message },
            CoreError::Parse { message } => Self::MalformedStatus { message },
            CoreError::NoSnapshot => Self::NoSnapshot,
            CoreError::CommandPending { action, .. } => Self::CommandPending { action },
            CoreError::CommandRejected { action, message } => {
                Self::CommandRejected { action, message }
            }
            CoreError::Config { message } => Self::Config(message),
            CoreError::Internal(message) => Self::Internal(message),
            err @ CoreError::AlreadyRunning => Self::Internal(err.to_string()),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other.to_string()),
        }
    }
}
