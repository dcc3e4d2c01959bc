//! Configuration for the BinasaMan dashboard.
//!
//! TOML profiles (one per pump controller) merged with defaults and
//! `BINASA_*` environment variables, and translation to
//! `binasa_core::DashboardConfig`. The CLI layers its own flag overrides
//! on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use binasa_core::{Backoff, DashboardConfig};

/// Prefix for environment overrides; nested keys use `__`
/// (`BINASA_DEFAULTS__TIMEOUT=5`).
pub const ENV_PREFIX: &str = "BINASA_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// HTTP request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_resync_delay_ms")]
    pub resync_delay_ms: u64,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_true")]
    pub push: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
            resync_delay_ms: default_resync_delay_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            push: true,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_resync_delay_ms() -> u64 {
    2000
}
fn default_reconnect_delay_ms() -> u64 {
    3000
}
fn default_true() -> bool {
    true
}

/// A named pump controller profile. Unset fields fall back to [`Defaults`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Device base URL (e.g., "http://192.168.4.1").
    pub device: String,

    /// Explicit push stream URL; derived from `device` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_port: Option<u16>,

    /// Set to `false` for poll-only operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<bool>,

    /// Pump control endpoint (`/control` or `/pump`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resync_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_delay_ms: Option<u64>,

    /// When set, reconnects back off exponentially up to this delay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_max_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "binasa", "binasa").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("binasa");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file is not
/// an error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to runtime config ───────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

fn positive_ms(field: &str, ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_millis(ms))
}

/// Build a `DashboardConfig` from a profile and the global defaults.
pub fn profile_to_dashboard_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<DashboardConfig, ConfigError> {
    let url = parse_url("device", &profile.device)?;
    let mut config = DashboardConfig::new(url);

    if let Some(ref raw) = profile.push_url {
        config.push_url = Some(parse_url("push_url", raw)?);
    }
    if let Some(port) = profile.push_port {
        config.push_port = port;
    }
    config.push_enabled = profile.push.unwrap_or(defaults.push);

    if let Some(ref path) = profile.control_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "control_path".into(),
                reason: "must not be empty".into(),
            });
        }
        config.control_path.clone_from(path);
    }

    config.poll_interval = positive_ms(
        "poll_interval_ms",
        profile.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
    )?;
    config.resync_delay = Duration::from_millis(
        profile.resync_delay_ms.unwrap_or(defaults.resync_delay_ms),
    );

    let reconnect = positive_ms(
        "reconnect_delay_ms",
        profile
            .reconnect_delay_ms
            .unwrap_or(defaults.reconnect_delay_ms),
    )?;
    config.backoff = match profile.reconnect_max_delay_ms {
        Some(max_ms) => Backoff::Exponential {
            initial: reconnect,
            max: Duration::from_millis(max_ms).max(reconnect),
        },
        None => Backoff::Fixed(reconnect),
    };

    config.accept_invalid_certs = profile.insecure.unwrap_or(defaults.insecure);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout).max(1));

    Ok(config)
}
