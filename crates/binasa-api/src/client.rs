// Device HTTP client
//
// Wraps `reqwest::Client` with the three endpoints the dashboard consumes:
// `GET /status`, `POST /control` and `GET /history`. Replies are checked
// for both HTTP status and the firmware's in-body `{ "error": ... }` field,
// since the device reports refusals with a 200.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{ControlReply, ControlRequest, HistoryPoint, PumpAction, StatusPayload};
use crate::transport::TransportConfig;

/// Default path of the pump control endpoint.
pub const DEFAULT_CONTROL_PATH: &str = "/control";

/// HTTP client for a single pump controller.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
    control_path: String,
}

impl DeviceClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the device root, e.g. `http://192.168.4.1`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            control_path: DEFAULT_CONTROL_PATH.into(),
        }
    }

    /// Use a different control endpoint (some firmware builds expose `/pump`).
    pub fn with_control_path(mut self, path: impl Into<String>) -> Self {
        self.control_path = path.into();
        self
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The control endpoint path in use.
    pub fn control_path(&self) -> &str {
        &self.control_path
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for a device path, keeping any base path prefix.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&full)?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the current status document.
    pub async fn status(&self) -> Result<StatusPayload, Error> {
        let url = self.endpoint("status")?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let body = checked_body(resp).await?;
        StatusPayload::from_json(&body)
    }

    /// Ask the device to switch the pump.
    ///
    /// A non-success status or an `error` field in the reply is a failure,
    /// whatever the HTTP status says.
    pub async fn control(&self, action: PumpAction) -> Result<ControlReply, Error> {
        let url = self.endpoint(&self.control_path)?;
        debug!(%action, "POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(&ControlRequest { action })
            .send()
            .await
            .map_err(Error::Transport)?;

        let body = checked_body(resp).await?;
        if body.trim().is_empty() {
            return Ok(ControlReply::default());
        }
        // The firmware sometimes answers with plain text; that still counts
        // as an acknowledgement as long as the status was a success.
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    /// Fetch the history samples for one day.
    pub async fn history(&self, date: NaiveDate) -> Result<Vec<HistoryPoint>, Error> {
        let mut url = self.endpoint("history")?;
        url.query_pairs_mut()
            .append_pair("date", &date.format("%Y-%m-%d").to_string());
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let body = checked_body(resp).await?;
        parse_json(&body)
    }

    /// The push stream URL on the same host as this client.
    pub fn push_url(&self, port: u16) -> Result<Url, Error> {
        push_url_for(&self.base_url, port)
    }
}

/// Derive the push stream URL (`ws://host:port/`) from a device base URL.
///
/// `https` bases map to `wss`.
pub fn push_url_for(base_url: &Url, port: u16) -> Result<Url, Error> {
    let host = base_url
        .host_str()
        .ok_or(Error::InvalidUrl(url::ParseError::EmptyHost))?;
    let scheme = if base_url.scheme() == "https" { "wss" } else { "ws" };
    Ok(Url::parse(&format!("{scheme}://{host}:{port}/"))?)
}

// ── Reply handling ──────────────────────────────────────────────────

/// Read a reply body, turning refusals into errors.
///
/// An `error` field wins over the status code because it is the most
/// specific explanation the device offers.
async fn checked_body(resp: reqwest::Response) -> Result<String, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    let reply: Option<ControlReply> = serde_json::from_str(&body).ok();
    if let Some(message) = reply.as_ref().and_then(|r| r.error.clone()) {
        return Err(Error::Device { message });
    }

    if !status.is_success() {
        return Err(Error::Http {
            status: status.as_u16(),
            message: reply.and_then(|r| r.message),
        });
    }

    Ok(body)
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.to_owned(),
    })
}
