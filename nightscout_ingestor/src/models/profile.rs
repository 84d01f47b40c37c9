//! Therapy profile documents as stored by Nightscout.
//!
//! Only the fields the autotune engine reads are typed; everything else is kept
//! verbatim in `extra` so a document survives a read/modify/write cycle.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// ISF assumed when a profile carries no sensitivity schedule (mg/dL/U).
pub const DEFAULT_ISF: f64 = 50.0;

/// Carb ratio assumed when a profile carries no carb-ratio schedule (g/U).
pub const DEFAULT_CARB_RATIO: f64 = 10.0;

/// One row of a time-of-day schedule (`sens`, `carbratio` or `basal`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Start of the row as `HH:MM`.
    #[serde(default = "midnight")]
    pub time: String,

    /// Row value; `None` when the stored value was not numeric.
    #[serde(default, deserialize_with = "crate::numeric::lenient_f64")]
    pub value: Option<f64>,

    #[serde(
        rename = "timeAsSeconds",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::numeric::lenient_f64"
    )]
    pub time_as_seconds: Option<f64>,
}

fn midnight() -> String {
    "00:00".to_string()
}

impl ScheduleEntry {
    pub fn new(time: impl Into<String>, value: f64) -> Self {
        Self {
            time: time.into(),
            value: Some(value),
            time_as_seconds: None,
        }
    }
}

/// A single named therapy profile (one entry of a profile store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TherapyProfile {
    /// Insulin sensitivity schedule (mg/dL/U in mg/dL profiles).
    #[serde(default)]
    pub sens: Vec<ScheduleEntry>,

    /// Carb ratio schedule (g/U).
    #[serde(default)]
    pub carbratio: Vec<ScheduleEntry>,

    /// Basal rate schedule (U/h).
    #[serde(default)]
    pub basal: Vec<ScheduleEntry>,

    /// Duration of insulin action in hours.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::numeric::lenient_f64"
    )]
    pub dia: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TherapyProfile {
    /// ISF of the first schedule row.
    ///
    /// The deviation model has no time-of-day lookup; every interval uses this value.
    pub fn first_isf(&self) -> f64 {
        first_value(&self.sens, "sens", DEFAULT_ISF)
    }

    /// Carb ratio of the first schedule row.
    pub fn first_carb_ratio(&self) -> f64 {
        first_value(&self.carbratio, "carbratio", DEFAULT_CARB_RATIO)
    }
}

fn first_value(schedule: &[ScheduleEntry], name: &str, fallback: f64) -> f64 {
    match schedule.first().and_then(|entry| entry.value) {
        Some(value) => value,
        None => {
            tracing::warn!(schedule = name, fallback, "schedule has no usable first entry");
            fallback
        }
    }
}

/// A profile document: a store of named profiles plus the name of the active one.
///
/// Generic over the store entry so uploads can carry adjusted documents of a
/// different shape than what was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument<P = TherapyProfile> {
    #[serde(rename = "defaultProfile")]
    pub default_profile: String,

    pub store: IndexMap<String, P>,

    #[serde(rename = "startDate", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mills: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<P> ProfileDocument<P> {
    /// The store entry selected by `defaultProfile`.
    pub fn active_profile(&self) -> Option<&P> {
        self.store.get(&self.default_profile)
    }

    /// Consumes the document, returning the active store entry.
    pub fn into_active_profile(mut self) -> Option<P> {
        self.store.shift_remove(&self.default_profile)
    }
}
