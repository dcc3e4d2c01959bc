// ── Runtime dashboard configuration ──
//
// Describes how to reach one pump controller and how the synchronization
// engine paces itself. Built by the CLI (usually from a binasa-config
// profile) and handed to `Controller`; core never reads files.

use std::time::Duration;

use binasa_api::{Backoff, PushConfig, TransportConfig, push_url_for};
use url::Url;

use crate::error::CoreError;

/// Port the firmware's push server listens on.
pub const DEFAULT_PUSH_PORT: u16 = 81;

/// Configuration for one dashboard session.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Device base URL (e.g., `http://192.168.4.1`).
    pub url: Url,
    /// Explicit push stream URL. Derived from `url` and `push_port` when unset.
    pub push_url: Option<Url>,
    pub push_port: u16,
    /// Disable to run in poll-only mode.
    pub push_enabled: bool,
    /// Reconnect policy for the push stream.
    pub backoff: Backoff,
    pub connect_timeout: Duration,
    /// Poll period while the push stream is not open.
    pub poll_interval: Duration,
    /// Delay between a successful command and the confirmatory re-sync.
    pub resync_delay: Duration,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Pump control endpoint (`/control`, or `/pump` on some firmware).
    pub control_path: String,
    pub accept_invalid_certs: bool,
}

impl DashboardConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            push_url: None,
            push_port: DEFAULT_PUSH_PORT,
            push_enabled: true,
            backoff: Backoff::default(),
            connect_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(2),
            resync_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
            control_path: binasa_api::client::DEFAULT_CONTROL_PATH.into(),
            accept_invalid_certs: false,
        }
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        if self.control_path.trim().is_empty() {
            return Err(CoreError::Config {
                message: "control path must not be empty".into(),
            });
        }
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(CoreError::Config {
                message: format!("device URL must be http or https, got '{}'", self.url),
            });
        }
        Ok(())
    }

    /// Push stream settings, or `None` in poll-only mode.
    pub fn push_config(&self) -> Result<Option<PushConfig>, CoreError> {
        if !self.push_enabled {
            return Ok(None);
        }
        let url = match &self.push_url {
            Some(url) => url.clone(),
            None => push_url_for(&self.url, self.push_port)?,
        };
        let mut push = PushConfig::new(url).with_backoff(self.backoff);
        push.connect_timeout = self.connect_timeout;
        Ok(Some(push))
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}
