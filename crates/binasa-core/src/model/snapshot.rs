// ── Status snapshot ──
//
// The one normalized view of device state. Built wholesale from a single
// wire payload; missing or out-of-range fields are defaulted and clamped
// here so nothing downstream has to second-guess the values.

use binasa_api::StatusPayload;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::Value;
use strum::Display;

/// Number of float sensors on current hardware.
pub const SENSOR_COUNT: usize = 3;

/// Water level for each float combination, indexed by `high*4 + mid*2 + low`.
const FLOAT_LEVELS: [u8; 8] = [0, 25, 50, 75, 100, 75, 50, 75];

/// Which transport produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SnapshotSource {
    Push,
    Poll,
    /// Confirmatory fetch after a pump command.
    Resync,
}

/// Normalized device state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Water level, always within `0..=100`.
    pub water_level_percent: u8,
    pub pump_on: bool,
    pub pump_manual_mode: bool,
    /// Foam level, always within `0..=100`.
    pub foam_percent: u8,
    pub system_shutdown: bool,
    /// Float connection flags, low to high.
    pub connected_sensors: [bool; SENSOR_COUNT],
    pub foam_threshold: Option<u8>,
    /// Device wall-clock label, as reported.
    pub device_time: Option<String>,
    pub source: SnapshotSource,
    pub observed_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Normalize a wire payload into a snapshot.
    pub fn from_payload(
        payload: &StatusPayload,
        source: SnapshotSource,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            water_level_percent: payload.level.as_ref().map_or(0, level_percent),
            pump_on: flag(payload.pump.as_ref()),
            pump_manual_mode: flag(payload.manual_mode.as_ref()),
            foam_percent: payload.foam.as_ref().map_or(0, percent),
            system_shutdown: flag(payload.shutdown.as_ref()),
            connected_sensors: sensors(payload.sensors_connected.as_ref()),
            foam_threshold: payload.foam_threshold.as_ref().and_then(opt_percent),
            device_time: payload.timestamp.as_ref().and_then(label),
            source,
            observed_at,
        }
    }

    /// "Last updated" in the operator's local time.
    pub fn last_updated(&self) -> DateTime<Local> {
        self.observed_at.with_timezone(&Local)
    }

    /// Number of floats reporting a connection.
    pub fn connected_sensor_count(&self) -> usize {
        self.connected_sensors.iter().filter(|c| **c).count()
    }
}

// ── Field normalization ──────────────────────────────────────────────

/// Clamp any numeric-looking value into `0..=100`. Garbage becomes 0.
fn percent(value: &Value) -> u8 {
    opt_percent(value).unwrap_or_else(|| {
        tracing::trace!(%value, "defaulting non-numeric percentage");
        0
    })
}

fn opt_percent(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if raw.is_nan() {
        return None;
    }
    let clamped = raw.round().clamp(0.0, 100.0);
    // Range-checked above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
    let pct = clamped as u8;
    Some(pct)
}

/// Water level: either a percentage or the raw `[low, mid, high]` floats.
fn level_percent(value: &Value) -> u8 {
    match value {
        Value::Array(floats) => {
            let on = |i: usize| floats.get(i).is_some_and(|v| flag(Some(v)));
            let index = usize::from(on(2)) * 4 + usize::from(on(1)) * 2 + usize::from(on(0));
            FLOAT_LEVELS.get(index).copied().unwrap_or(0)
        }
        other => percent(other),
    }
}

/// Truthiness as the firmware variants encode it.
fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "on" | "1" | "yes"
        ),
        _ => false,
    }
}

fn sensors(value: Option<&Value>) -> [bool; SENSOR_COUNT] {
    let mut out = [false; SENSOR_COUNT];
    if let Some(Value::Array(items)) = value {
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = flag(Some(item));
        }
    }
    out
}

fn label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
