// ── Connectivity indicator ──

use binasa_api::PushState;
use serde::Serialize;
use strum::Display;

/// Link health as shown to the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Connectivity {
    /// Push stream state.
    pub push: PushState,
    /// Set when the last poll failed; cleared by the next success.
    pub poll_degraded: bool,
    /// Most recent transport failure, if any.
    pub last_error: Option<String>,
}

/// Condensed form of [`Connectivity`] for status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LinkMode {
    /// Push stream open; snapshots arrive unsolicited.
    Live,
    /// Push down, polls succeeding.
    Polling,
    /// Push down and the last poll failed.
    Degraded,
}

impl Connectivity {
    pub fn mode(&self) -> LinkMode {
        if self.push.is_open() {
            LinkMode::Live
        } else if self.poll_degraded {
            LinkMode::Degraded
        } else {
            LinkMode::Polling
        }
    }
}
