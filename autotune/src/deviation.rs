//! Deviation calculator.
//!
//! Pairs consecutive glucose readings and compares the observed change with what
//! a deliberately coarse linear model predicts from the treatments logged in
//! between. The residual ("deviation") is what the recommendation engine works on.
//!
//! The model:
//! - each insulin treatment lowers glucose by `units * ISF`
//! - each carb treatment raises glucose by `grams / carb_ratio * 50`
//!
//! ISF and carb ratio are the first rows of their schedules; there is no
//! time-of-day lookup and no insulin-on-board or absorption curve.

use chrono::NaiveDateTime;
use nightscout_ingestor::models::{glucose::GlucoseReading, profile::TherapyProfile, treatment::Treatment};
use serde::{Deserialize, Serialize};

use crate::errors::AutotuneError;

/// Pairs further apart than this are not attributed to treatments.
pub const MAX_PAIR_GAP_MINUTES: f64 = 15.0;

/// mg/dL rise per carb-ratio-normalised gram of carbohydrate.
pub const CARB_IMPACT_FACTOR: f64 = 50.0;

/// One adjacent-reading pair and its unexplained glucose movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationRecord {
    /// Timestamp of the later reading of the pair.
    pub timestamp: NaiveDateTime,
    /// Glucose value of the later reading (mg/dL).
    pub glucose: i32,
    /// `actual_change - expected_change` in mg/dL.
    pub deviation: f64,
    /// Treatments logged within the pair's interval (bounds inclusive).
    pub treatments: usize,
    /// True when no treatment falls in the interval.
    pub basal_only: bool,
    pub interval_minutes: f64,
}

/// Linear expected-change model parameterised from a therapy profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviationModel {
    pub isf: f64,
    pub carb_ratio: f64,
}

impl DeviationModel {
    pub fn from_profile(profile: &TherapyProfile) -> Result<Self, AutotuneError> {
        let isf = profile.first_isf();
        let carb_ratio = profile.first_carb_ratio();
        if !isf.is_finite() {
            return Err(AutotuneError::InvalidProfile(format!("ISF {isf} is not a number")));
        }
        Ok(Self { isf, carb_ratio })
    }

    /// Glucose change the model attributes to `treatments`.
    ///
    /// The carb ratio is only checked when a carb amount has to be divided by it.
    pub fn expected_change<'a>(
        &self,
        treatments: impl IntoIterator<Item = &'a Treatment>,
    ) -> Result<f64, AutotuneError> {
        treatments.into_iter().try_fold(0.0, |acc, t| {
            let mut change = acc;
            if let Some(units) = t.insulin_units() {
                change -= units * self.isf;
            }
            if let Some(grams) = t.carb_grams() {
                if !(self.carb_ratio.is_finite() && self.carb_ratio > 0.0) {
                    return Err(AutotuneError::InvalidProfile(format!(
                        "carb ratio {} must be positive to account for {grams} g of carbs",
                        self.carb_ratio
                    )));
                }
                change += grams / self.carb_ratio * CARB_IMPACT_FACTOR;
            }
            Ok(change)
        })
    }

    /// Deviation records for every adjacent pair `0 < gap <= 15 min`.
    ///
    /// `readings` must be sorted ascending; `treatments` may be in any order.
    /// Duplicate timestamps form zero-length pairs and are skipped.
    pub fn deviations(
        &self,
        readings: &[GlucoseReading],
        treatments: &[Treatment],
    ) -> Result<Vec<DeviationRecord>, AutotuneError> {
        readings
            .windows(2)
            .filter_map(|pair| {
                let (earlier, later) = (&pair[0], &pair[1]);
                let interval_minutes =
                    (later.timestamp - earlier.timestamp).num_milliseconds() as f64 / 60_000.0;
                if interval_minutes <= 0.0 || interval_minutes > MAX_PAIR_GAP_MINUTES {
                    return None;
                }

                let in_interval: Vec<&Treatment> = treatments
                    .iter()
                    .filter(|t| earlier.timestamp <= t.timestamp && t.timestamp <= later.timestamp)
                    .collect();

                let actual_change = f64::from(later.value - earlier.value);
                let expected_change = match self.expected_change(in_interval.iter().copied()) {
                    Ok(change) => change,
                    Err(e) => return Some(Err(e)),
                };

                Some(Ok(DeviationRecord {
                    timestamp: later.timestamp,
                    glucose: later.value,
                    deviation: actual_change - expected_change,
                    treatments: in_interval.len(),
                    basal_only: in_interval.is_empty(),
                    interval_minutes,
                }))
            })
            .collect()
    }
}

/// Convenience wrapper: build the model from `profile` and compute deviations.
pub fn calculate_deviations(
    readings: &[GlucoseReading],
    treatments: &[Treatment],
    profile: &TherapyProfile,
) -> Result<Vec<DeviationRecord>, AutotuneError> {
    DeviationModel::from_profile(profile)?.deviations(readings, treatments)
}

/// Arithmetic mean of the deviations, `None` for an empty set.
pub fn mean_deviation<'a>(records: impl IntoIterator<Item = &'a DeviationRecord>) -> Option<f64> {
    let (sum, count) = records
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), r| (sum + r.deviation, count + 1));
    (count > 0).then(|| sum / count as f64)
}
