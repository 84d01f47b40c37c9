//! OpenAPS-style pump profile, the document the applier reads and writes.

use nightscout_ingestor::models::profile::{ScheduleEntry, TherapyProfile};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    config::InsulinCurve,
    recommendation::round_to,
    schedule::{TimedValue, format_start, parse_schedule},
};

/// mg/dL per mmol/L.
pub const MGDL_PER_MMOL: f64 = 18.0;

/// Glucose unit an ISF schedule is expressed in (per unit of insulin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GlucoseUnit {
    #[default]
    #[serde(rename = "mg/dL")]
    MgDl,
    #[serde(rename = "mmol/L")]
    Mmol,
}

impl GlucoseUnit {
    /// Reads a Nightscout `units` label; anything not mentioning mmol is mg/dL.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(l) if l.to_ascii_lowercase().contains("mmol") => GlucoseUnit::Mmol,
            _ => GlucoseUnit::MgDl,
        }
    }

    /// Expresses `value` (given in `self`) in `target`.
    pub fn convert(self, value: f64, target: GlucoseUnit) -> f64 {
        match (self, target) {
            (GlucoseUnit::MgDl, GlucoseUnit::Mmol) => value / MGDL_PER_MMOL,
            (GlucoseUnit::Mmol, GlucoseUnit::MgDl) => value * MGDL_PER_MMOL,
            _ => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasalSegment {
    pub i: u32,
    pub minutes: f64,
    /// `HH:MM:SS`
    pub start: String,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsfSegment {
    pub i: u32,
    pub start: String,
    pub sensitivity: f64,
    pub offset: u32,
    pub x: u32,
    #[serde(rename = "endOffset")]
    pub end_offset: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IsfProfile {
    #[serde(default)]
    pub units: GlucoseUnit,
    #[serde(default)]
    pub sensitivities: Vec<IsfSegment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbRatioSegment {
    pub i: u32,
    pub start: String,
    pub offset: u32,
    pub x: u32,
    pub r: f64,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CarbRatioSchedule {
    #[serde(default = "default_carb_units")]
    pub units: String,
    #[serde(default)]
    pub schedule: Vec<CarbRatioSegment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_carb_units() -> String {
    "grams".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpProfile {
    pub dia: f64,
    #[serde(default)]
    pub basalprofile: Vec<BasalSegment>,
    #[serde(rename = "isfProfile", default)]
    pub isf_profile: IsfProfile,
    pub carb_ratio: f64,
    #[serde(default)]
    pub carb_ratios: CarbRatioSchedule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub curve: InsulinCurve,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PumpProfile {
    /// Converts a Nightscout store entry into pump form.
    ///
    /// Malformed schedule rows are dropped with a warning (see [`parse_schedule`]).
    /// `default_dia` applies when the store entry has no usable `dia`.
    pub fn from_therapy(profile: &TherapyProfile, curve: InsulinCurve, default_dia: f64) -> Self {
        let basalprofile = parse_schedule(&profile.basal, "basal")
            .into_iter()
            .enumerate()
            .map(|(i, row)| BasalSegment {
                i: i as u32,
                minutes: f64::from(row.minutes),
                start: format_start(row.minutes),
                rate: row.value,
            })
            .collect();

        let sensitivities = with_end_offsets(parse_schedule(&profile.sens, "sens"))
            .map(|(i, row, end)| IsfSegment {
                i,
                start: format_start(row.minutes),
                sensitivity: row.value,
                offset: row.minutes,
                x: i,
                end_offset: end,
            })
            .collect();

        let schedule: Vec<CarbRatioSegment> = parse_schedule(&profile.carbratio, "carbratio")
            .into_iter()
            .enumerate()
            .map(|(i, row)| CarbRatioSegment {
                i: i as u32,
                start: format_start(row.minutes),
                offset: row.minutes,
                x: i as u32,
                r: row.value,
                ratio: row.value,
            })
            .collect();

        Self {
            dia: profile.dia.unwrap_or(default_dia),
            basalprofile,
            isf_profile: IsfProfile {
                units: GlucoseUnit::from_label(profile.units.as_deref()),
                sensitivities,
                extra: Map::new(),
            },
            carb_ratio: profile.first_carb_ratio(),
            carb_ratios: CarbRatioSchedule {
                units: default_carb_units(),
                schedule,
                extra: Map::new(),
            },
            units: profile.units.clone(),
            timezone: profile.timezone.clone(),
            curve,
            extra: Map::new(),
        }
    }

    /// Converts back into a Nightscout store entry.
    ///
    /// Schedules, `dia` and `timezone` come from `self`; every other field of
    /// `base` (units, targets, custom keys) is carried over. Sensitivities are
    /// converted to the unit `base` declares, so the entry never mixes units.
    pub fn to_therapy(&self, base: &TherapyProfile) -> TherapyProfile {
        let target_unit = GlucoseUnit::from_label(base.units.as_deref());
        let sensitivity = |value: f64| {
            if self.isf_profile.units == target_unit {
                value
            } else {
                round_to(self.isf_profile.units.convert(value, target_unit), 3)
            }
        };
        let entry = |minutes: f64, value: f64| {
            let minutes = minutes.max(0.0) as u32;
            ScheduleEntry {
                time: format!("{:02}:{:02}", minutes / 60, minutes % 60),
                value: Some(value),
                time_as_seconds: Some(f64::from(minutes * 60)),
            }
        };

        TherapyProfile {
            sens: self
                .isf_profile
                .sensitivities
                .iter()
                .map(|s| entry(f64::from(s.offset), sensitivity(s.sensitivity)))
                .collect(),
            carbratio: self
                .carb_ratios
                .schedule
                .iter()
                .map(|c| entry(f64::from(c.offset), c.ratio))
                .collect(),
            basal: self.basalprofile.iter().map(|b| entry(b.minutes, b.rate)).collect(),
            dia: Some(self.dia),
            timezone: self.timezone.clone().or_else(|| base.timezone.clone()),
            units: base.units.clone(),
            extra: base.extra.clone(),
        }
    }
}

/// Pairs each row with its index and the minute its segment ends.
fn with_end_offsets(rows: Vec<TimedValue>) -> impl Iterator<Item = (u32, TimedValue, u32)> {
    let ends: Vec<u32> = rows
        .iter()
        .skip(1)
        .map(|row| row.minutes)
        .chain(std::iter::once(crate::schedule::MINUTES_PER_DAY))
        .collect();
    rows.into_iter()
        .zip(ends)
        .enumerate()
        .map(|(i, (row, end))| (i as u32, row, end))
}
