//! Recommendation engine.
//!
//! Turns a run's deviation records into bounded, multiplicative adjustments:
//! one ISF row, one (unchanged) carb-ratio row and one row per hour of day
//! for the basal schedule. Pure and deterministic; identical inputs always give
//! identical output.

use chrono::Timelike;
use nightscout_ingestor::models::profile::TherapyProfile;
use serde::{Deserialize, Serialize};

use crate::{
    deviation::{DeviationRecord, mean_deviation},
    schedule::{parse_schedule, value_at},
};

pub const ISF_PARAMETER: &str = "ISF[mg/dL/U]";
pub const CARB_RATIO_PARAMETER: &str = "CarbRatio(g/U)";

/// Mean deviation (mg/dL) beyond which ISF is adjusted.
pub const ISF_DEVIATION_THRESHOLD: f64 = 5.0;

/// Hard safety bounds for any adjusted basal rate (U/h).
pub const MIN_BASAL_RATE: f64 = 0.1;
pub const MAX_BASAL_RATE: f64 = 5.0;

const RAISE_FACTOR: f64 = 1.1;
const LOWER_FACTOR: f64 = 0.9;

/// One row of the output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// `ISF[mg/dL/U]`, `CarbRatio(g/U)` or an hour label `HH:00`.
    #[serde(rename = "Parameter")]
    pub parameter: String,
    /// Current (pump) value.
    #[serde(rename = "Pump")]
    pub pump: f64,
    /// Recommended value.
    #[serde(rename = "Autotune")]
    pub autotune: f64,
    /// Always 0: per-hour coverage gaps are not computed.
    #[serde(rename = "DaysMissing")]
    pub days_missing: u32,
}

impl Recommendation {
    pub fn new(parameter: impl Into<String>, pump: f64, autotune: f64) -> Self {
        Self {
            parameter: parameter.into(),
            pump,
            autotune,
            days_missing: 0,
        }
    }

    /// Hour label for basal rows.
    pub fn hour_label(hour: u32) -> String {
        format!("{hour:02}:00")
    }
}

/// How much evidence a basal bucket needs and how large its mean deviation
/// must be before the rate moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningMode {
    #[default]
    Standard,
    Aggressive,
}

impl TuningMode {
    pub fn from_aggressive(aggressive: bool) -> Self {
        if aggressive {
            TuningMode::Aggressive
        } else {
            TuningMode::Standard
        }
    }

    /// Minimum basal-only records per hour bucket.
    pub fn min_data_points(&self) -> usize {
        match self {
            TuningMode::Standard => 3,
            TuningMode::Aggressive => 2,
        }
    }

    /// Mean deviation (mg/dL, either sign) that triggers an adjustment.
    pub fn deviation_threshold(&self) -> f64 {
        match self {
            TuningMode::Standard => 20.0,
            TuningMode::Aggressive => 10.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TuningMode::Standard => "standard",
            TuningMode::Aggressive => "aggressive",
        }
    }
}

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// ISF row: lower ISF 10% when glucose runs above the model on average,
/// raise it 10% when below. `None` when there are no deviations at all.
pub fn recommend_isf(deviations: &[DeviationRecord], current_isf: f64) -> Option<Recommendation> {
    let mean = mean_deviation(deviations)?;
    let recommended = if mean > ISF_DEVIATION_THRESHOLD {
        current_isf * LOWER_FACTOR
    } else if mean < -ISF_DEVIATION_THRESHOLD {
        current_isf * RAISE_FACTOR
    } else {
        current_isf
    };
    tracing::debug!(mean, current_isf, recommended, "ISF recommendation");
    Some(Recommendation::new(ISF_PARAMETER, current_isf, round_to(recommended, 1)))
}

/// Carb-ratio row. Carb-ratio tuning is not implemented; the current value is echoed.
pub fn recommend_carb_ratio(current_ratio: f64) -> Recommendation {
    Recommendation::new(CARB_RATIO_PARAMETER, current_ratio, current_ratio)
}

/// Recommended rate for one hour bucket.
///
/// Only basal-only records whose hour lies in `[hour, (hour + 1) % 24)` count,
/// so the 23:00 bucket never collects data and keeps its rate. With fewer
/// than the mode's minimum the current rate is returned exactly; otherwise the
/// adjusted rate is clamped to `[0.1, 5.0]` and rounded to 2 decimals.
pub fn recommend_basal_rate(
    deviations: &[DeviationRecord],
    hour: u32,
    current_rate: f64,
    mode: TuningMode,
) -> f64 {
    let next = (hour + 1) % 24;
    let bucket: Vec<&DeviationRecord> = deviations
        .iter()
        .filter(|d| d.basal_only && d.timestamp.hour() >= hour && d.timestamp.hour() < next)
        .collect();

    if bucket.len() < mode.min_data_points() {
        tracing::debug!(
            hour,
            points = bucket.len(),
            required = mode.min_data_points(),
            mode = mode.as_str(),
            "not enough basal-only data, keeping current rate"
        );
        return current_rate;
    }

    let threshold = mode.deviation_threshold();
    let mean = mean_deviation(bucket.iter().copied()).unwrap_or(0.0);
    let factor = if mean > threshold {
        RAISE_FACTOR
    } else if mean < -threshold {
        LOWER_FACTOR
    } else {
        1.0
    };

    let recommended = round_to((current_rate * factor).clamp(MIN_BASAL_RATE, MAX_BASAL_RATE), 2);
    tracing::debug!(hour, mean, threshold, factor, current_rate, recommended, "basal recommendation");
    recommended
}

/// Current basal rate for each hour of the day.
///
/// Each hour takes the rate of the last schedule row starting at or before
/// `HH:00`. Rows with malformed labels or values are skipped with a warning.
pub fn hourly_basal_rates(profile: &TherapyProfile) -> Vec<(u32, f64)> {
    let schedule = parse_schedule(&profile.basal, "basal");
    if schedule.is_empty() {
        tracing::warn!("profile has no usable basal schedule");
        return Vec::new();
    }
    (0..24)
        .filter_map(|hour| value_at(&schedule, hour * 60).map(|rate| (hour, rate)))
        .collect()
}

/// The complete recommendation set for one run.
pub fn recommend(deviations: &[DeviationRecord], profile: &TherapyProfile, mode: TuningMode) -> Vec<Recommendation> {
    let mut recommendations = Vec::with_capacity(26);

    if let Some(isf) = recommend_isf(deviations, profile.first_isf()) {
        recommendations.push(isf);
    }
    recommendations.push(recommend_carb_ratio(profile.first_carb_ratio()));

    let basal_only = deviations.iter().filter(|d| d.basal_only).count();
    tracing::info!(
        deviations = deviations.len(),
        basal_only,
        mode = mode.as_str(),
        "analyzing basal rates"
    );

    recommendations.extend(hourly_basal_rates(profile).into_iter().map(|(hour, current)| {
        Recommendation::new(
            Recommendation::hour_label(hour),
            current,
            recommend_basal_rate(deviations, hour, current, mode),
        )
    }));

    recommendations
}
