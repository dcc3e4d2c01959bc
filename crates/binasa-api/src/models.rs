// Wire models for the device's HTTP and push endpoints.
//
// The firmware variants in the field disagree on field names (`level` vs
// `floats`, `foam` vs `adc`, `sensors` vs `sensorsConnected`) and on value
// types, so the status document keeps every field as a raw JSON value.
// Normalization into a typed snapshot happens in `binasa-core`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::Error;

// ── Status document ─────────────────────────────────────────────────

/// Raw status document served by `GET /status` and broadcast on the push
/// stream.
///
/// Every field is optional. Values are kept as untyped JSON because upstream
/// firmware sends numbers as strings, floats as integers, and so on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    /// Water level percentage, or the raw float-switch readings.
    #[serde(default, alias = "floats", skip_serializing_if = "Option::is_none")]
    pub level: Option<Value>,

    /// Pump actuator state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pump: Option<Value>,

    /// Whether the pump is under manual (operator) control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_mode: Option<Value>,

    /// Foam / vinaza level from the optical sensor.
    #[serde(default, alias = "adc", skip_serializing_if = "Option::is_none")]
    pub foam: Option<Value>,

    /// Whether the physical shutdown switch has halted the system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<Value>,

    /// Per-float connection flags (three entries on current hardware).
    #[serde(default, alias = "sensors", skip_serializing_if = "Option::is_none")]
    pub sensors_connected: Option<Value>,

    /// Foam threshold that triggers the automatic pump.
    #[serde(default, rename = "foamTh", skip_serializing_if = "Option::is_none")]
    pub foam_threshold: Option<Value>,

    /// Device wall-clock label (`YYYY-MM-DD HH:MM:SS`, device local time).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
}

/// Alternate field names, paired with the canonical name that wins when a
/// document carries both.
const FIELD_ALIASES: [(&str, &str); 3] = [
    ("level", "floats"),
    ("foam", "adc"),
    ("sensorsConnected", "sensors"),
];

impl StatusPayload {
    /// Parse a status document from raw text.
    ///
    /// The document must be a JSON object. Unknown keys are ignored and
    /// missing fields stay `None`, so `{}` yields an all-default payload.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: text.to_owned(),
        })?;
        Self::from_value(value)
    }

    /// Build a status document from an already-parsed JSON value.
    pub fn from_value(mut value: Value) -> Result<Self, Error> {
        if !value.is_object() {
            return Err(Error::Deserialization {
                message: "expected a JSON object".into(),
                body: value.to_string(),
            });
        }

        // serde rejects a canonical name and its alias together as a duplicate.
        if let Some(fields) = value.as_object_mut() {
            for (canonical, alias) in FIELD_ALIASES {
                if fields.contains_key(canonical) {
                    fields.remove(alias);
                }
            }
        }

        let body = value.to_string();
        serde_json::from_value(value).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

// ── Control ─────────────────────────────────────────────────────────

/// The two actions the pump endpoint understands.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PumpAction {
    On,
    Off,
}

impl PumpAction {
    /// The action that flips a pump currently in the given state.
    pub fn toggle_from(pump_on: bool) -> Self {
        if pump_on { Self::Off } else { Self::On }
    }

    /// The pump state this action asks for.
    pub fn target_state(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Body of `POST /control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    pub action: PumpAction,
}

/// Reply from the control endpoint.
///
/// The firmware answers `{"status":"ok","message":"..."}` on success and
/// `{"error":"..."}` on refusal, both with HTTP 200.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// ── History ─────────────────────────────────────────────────────────

/// One sample of the daily history read contract.
///
/// Field names follow the upstream spreadsheet columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Time-of-day label (`HH:MM` or `HH:MM:SS`).
    pub hora: String,
    /// Water level percentage.
    #[serde(default)]
    pub agua: f64,
    /// Foam level percentage.
    #[serde(default)]
    pub espuma: f64,
}
