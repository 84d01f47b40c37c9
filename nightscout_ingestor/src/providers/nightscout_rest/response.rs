//! Raw Nightscout documents and their conversion into canonical models.
//!
//! Every field is optional here; records that cannot be turned into a model
//! are dropped during conversion instead of failing the whole response.

use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    models::{
        glucose::{GlucoseReading, TrendDirection},
        treatment::Treatment,
    },
    numeric::{field_as_f64, value_as_f64},
    tz::{millis_to_wall_clock, parse_created_at},
};

/// Entry type carrying a sensor glucose value.
pub const SGV_TYPE: &str = "sgv";

#[derive(Deserialize, Debug)]
pub struct NightscoutEntry {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub sgv: Option<Value>,
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

impl NightscoutEntry {
    /// Converts an `sgv` entry with a non-zero numeric value; anything else yields `None`.
    pub fn into_reading(self, tz: Tz) -> Option<GlucoseReading> {
        if self.kind.as_deref() != Some(SGV_TYPE) {
            return None;
        }
        let value = self.sgv.as_ref().and_then(value_as_f64)?.round() as i32;
        if value == 0 {
            return None;
        }
        let millis = self.date.as_ref().and_then(value_as_f64)? as i64;
        let Some(timestamp) = millis_to_wall_clock(millis, tz) else {
            tracing::warn!(millis, "dropping entry with out-of-range date");
            return None;
        };

        Some(GlucoseReading {
            timestamp,
            value,
            direction: self
                .direction
                .as_deref()
                .map(TrendDirection::from_label)
                .unwrap_or_default(),
            device: self.device.unwrap_or_else(|| "Unknown".to_string()),
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct NightscoutTreatment {
    #[serde(rename = "eventType", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(rename = "isValid", default = "valid_when_absent")]
    pub is_valid: Value,
    #[serde(default)]
    pub insulin: Option<Value>,
    #[serde(default)]
    pub carbs: Option<Value>,
    #[serde(default)]
    pub rate: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub absolute: Option<Value>,
}

fn valid_when_absent() -> Value {
    Value::Bool(true)
}

impl NightscoutTreatment {
    /// A missing `isValid` means valid; a present one must be truthy
    /// (`false`, `null`, `0`, `""`, `[]` and `{}` all mark the treatment invalid).
    pub fn is_valid(&self) -> bool {
        match &self.is_valid {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }

    /// Converts a valid treatment with a parseable `created_at`.
    ///
    /// Non-numeric amounts are logged and treated as absent.
    pub fn into_treatment(self, tz: Tz) -> Option<Treatment> {
        if !self.is_valid() {
            return None;
        }
        let Some(raw_ts) = self.created_at.as_deref() else {
            tracing::warn!(event_type = ?self.event_type, "dropping treatment without created_at");
            return None;
        };
        let Some(timestamp) = parse_created_at(raw_ts, tz) else {
            tracing::warn!(created_at = raw_ts, "dropping treatment with unparsable created_at");
            return None;
        };

        Some(Treatment {
            timestamp,
            insulin: field_as_f64("insulin", self.insulin.as_ref()),
            carbs: field_as_f64("carbs", self.carbs.as_ref()),
            rate: field_as_f64("rate", self.rate.as_ref()),
            duration: field_as_f64("duration", self.duration.as_ref()),
            absolute: field_as_f64("absolute", self.absolute.as_ref()),
            event_type: self.event_type.unwrap_or_default(),
        })
    }
}
