//! Canonical in-memory representation of a continuous glucose monitor reading.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// CGM trend arrow as reported by the uploader.
///
/// Unrecognised labels map to [`TrendDirection::Unknown`] rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum TrendDirection {
    DoubleUp,
    SingleUp,
    FortyFiveUp,
    Flat,
    FortyFiveDown,
    SingleDown,
    DoubleDown,
    NotComputable,
    RateOutOfRange,
    None,
    #[default]
    Unknown,
}

impl TrendDirection {
    /// The label Nightscout uses for this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::DoubleUp => "DoubleUp",
            TrendDirection::SingleUp => "SingleUp",
            TrendDirection::FortyFiveUp => "FortyFiveUp",
            TrendDirection::Flat => "Flat",
            TrendDirection::FortyFiveDown => "FortyFiveDown",
            TrendDirection::SingleDown => "SingleDown",
            TrendDirection::DoubleDown => "DoubleDown",
            TrendDirection::NotComputable => "NOT COMPUTABLE",
            TrendDirection::RateOutOfRange => "RATE OUT OF RANGE",
            TrendDirection::None => "NONE",
            TrendDirection::Unknown => "Unknown",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "DoubleUp" => TrendDirection::DoubleUp,
            "SingleUp" => TrendDirection::SingleUp,
            "FortyFiveUp" => TrendDirection::FortyFiveUp,
            "Flat" => TrendDirection::Flat,
            "FortyFiveDown" => TrendDirection::FortyFiveDown,
            "SingleDown" => TrendDirection::SingleDown,
            "DoubleDown" => TrendDirection::DoubleDown,
            "NOT COMPUTABLE" | "NotComputable" => TrendDirection::NotComputable,
            "RATE OUT OF RANGE" | "RateOutOfRange" => TrendDirection::RateOutOfRange,
            "NONE" | "None" => TrendDirection::None,
            _ => TrendDirection::Unknown,
        }
    }
}

impl From<String> for TrendDirection {
    fn from(label: String) -> Self {
        TrendDirection::from_label(&label)
    }
}

impl From<TrendDirection> for String {
    fn from(direction: TrendDirection) -> Self {
        direction.as_str().to_string()
    }
}

/// A single sensor glucose value.
///
/// Timestamps are naive wall-clock times; the source offset has already been
/// applied and stripped by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseReading {
    /// When the reading was taken.
    pub timestamp: NaiveDateTime,

    /// Sensor glucose in mg/dL.
    pub value: i32,

    /// Trend arrow reported with the reading.
    pub direction: TrendDirection,

    /// Free-text uploader/device label, `"Unknown"` when absent.
    pub device: String,
}
