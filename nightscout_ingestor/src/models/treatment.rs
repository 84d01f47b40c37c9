//! Canonical in-memory representation of a logged treatment (bolus, carbs, temp basal...).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A treatment event as recorded in the care portal.
///
/// Entries flagged invalid by the source never make it into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    /// When the treatment was logged (naive wall-clock time).
    pub timestamp: NaiveDateTime,

    /// Free-text kind, e.g. "Meal Bolus", "Correction Bolus", "Temp Basal".
    pub event_type: String,

    /// Insulin delivered, in units.
    pub insulin: Option<f64>,

    /// Carbohydrates eaten, in grams.
    pub carbs: Option<f64>,

    /// Temp basal rate (U/h) for temp basal events.
    pub rate: Option<f64>,

    /// Temp basal duration in minutes.
    pub duration: Option<f64>,

    /// Absolute temp basal rate (U/h) when the pump reports one.
    pub absolute: Option<f64>,
}

impl Treatment {
    /// Insulin amount when one was recorded and is non-zero.
    pub fn insulin_units(&self) -> Option<f64> {
        self.insulin.filter(|u| *u != 0.0)
    }

    /// Carb amount when one was recorded and is non-zero.
    pub fn carb_grams(&self) -> Option<f64> {
        self.carbs.filter(|g| *g != 0.0)
    }
}
