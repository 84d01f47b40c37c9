//! Merges a recommendation set into a pump profile.
//!
//! The merge is all-or-nothing: if any step fails the original profile is
//! returned untouched.

use thiserror::Error;

use crate::{
    pump_profile::{BasalSegment, GlucoseUnit, PumpProfile},
    recommendation::{ISF_PARAMETER, Recommendation, round_to},
};

const TIME_FACTORS: [i64; 3] = [3600, 60, 1];

#[derive(Debug, Error, PartialEq)]
pub enum ApplyError {
    #[error("profile has no {0} entry to overwrite")]
    MissingEntry(&'static str),

    #[error("recommended value for {parameter} is not finite: {value}")]
    NonFinite { parameter: String, value: f64 },
}

/// Applies `recommendations` to a copy of `profile`.
///
/// Returns `profile` unchanged (with an error logged) when the merge fails.
pub fn apply_recommendations(recommendations: &[Recommendation], profile: &PumpProfile) -> PumpProfile {
    match try_apply(recommendations, profile) {
        Ok(adjusted) => adjusted,
        Err(e) => {
            tracing::error!(error = %e, "failed to create adjusted profile, keeping original");
            profile.clone()
        }
    }
}

/// Applies `recommendations` to a copy of `profile`, failing on the first problem.
pub fn try_apply(recommendations: &[Recommendation], profile: &PumpProfile) -> Result<PumpProfile, ApplyError> {
    let mut adjusted = profile.clone();

    for rec in recommendations {
        if rec.parameter.contains(ISF_PARAMETER) {
            let isf = finite(rec)?;
            set_isf_mmol(&mut adjusted, isf)?;
        } else if rec.parameter.contains("CarbRatio") {
            let ratio = round_to(finite(rec)?, 1);
            let first = adjusted
                .carb_ratios
                .schedule
                .first_mut()
                .ok_or(ApplyError::MissingEntry("carb ratio"))?;
            first.ratio = ratio;
            adjusted.carb_ratio = ratio;
        }
    }

    let mut basal = Vec::new();
    for rec in recommendations {
        if rec.parameter.chars().any(char::is_alphabetic) || !rec.parameter.contains(':') {
            continue;
        }
        let Some(seconds) = label_seconds(&rec.parameter) else {
            tracing::warn!(parameter = %rec.parameter, "could not parse time parameter");
            continue;
        };
        let hour = seconds.div_euclid(3600);
        if !(0..24).contains(&hour) {
            tracing::debug!(parameter = %rec.parameter, hour, "hour out of range, skipping");
            continue;
        }
        let hour = hour as u32;
        basal.push(BasalSegment {
            i: hour,
            minutes: f64::from(hour * 60),
            start: format!("{hour:02}:00:00"),
            rate: round_to(finite(rec)?, 2),
        });
    }

    if !basal.is_empty() {
        basal.sort_by_key(|segment| segment.i);
        adjusted.basalprofile = basal;
    }

    Ok(adjusted)
}

/// Writes the recommended ISF (in the profile's own unit) as mmol/L/U into the
/// first sensitivity row and moves the remaining rows to mmol/L/U as well.
fn set_isf_mmol(profile: &mut PumpProfile, isf: f64) -> Result<(), ApplyError> {
    let from = profile.isf_profile.units;
    let sensitivities = &mut profile.isf_profile.sensitivities;
    let (first, rest) = sensitivities
        .split_first_mut()
        .ok_or(ApplyError::MissingEntry("sensitivity"))?;

    first.sensitivity = round_to(from.convert(isf, GlucoseUnit::Mmol), 1);
    for segment in rest {
        segment.sensitivity = from.convert(segment.sensitivity, GlucoseUnit::Mmol);
    }
    profile.isf_profile.units = GlucoseUnit::Mmol;
    Ok(())
}

/// Seconds since midnight of an `H:M[:S]` label. Extra components are ignored.
fn label_seconds(label: &str) -> Option<i64> {
    label
        .split(':')
        .zip(TIME_FACTORS)
        .map(|(part, factor)| part.trim().parse::<i64>().ok().map(|v| v * factor))
        .sum()
}

fn finite(rec: &Recommendation) -> Result<f64, ApplyError> {
    if rec.autotune.is_finite() {
        Ok(rec.autotune)
    } else {
        Err(ApplyError::NonFinite {
            parameter: rec.parameter.clone(),
            value: rec.autotune,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::InsulinCurve, recommendation::CARB_RATIO_PARAMETER};
    use nightscout_ingestor::models::profile::{ScheduleEntry, TherapyProfile};

    fn profile() -> PumpProfile {
        let therapy = TherapyProfile {
            sens: vec![ScheduleEntry::new("00:00", 2.8)],
            carbratio: vec![ScheduleEntry::new("00:00", 10.0)],
            basal: vec![ScheduleEntry::new("00:00", 0.8), ScheduleEntry::new("06:00", 1.0)],
            ..Default::default()
        };
        PumpProfile::from_therapy(&therapy, InsulinCurve::RapidActing, 4.0)
    }

    #[test]
    fn isf_is_converted_to_mmol() {
        let recs = [Recommendation::new(ISF_PARAMETER, 50.0, 47.0)];
        let adjusted = apply_recommendations(&recs, &profile());
        assert_eq!(adjusted.isf_profile.sensitivities[0].sensitivity, 2.6);
    }

    #[test]
    fn whole_sensitivity_schedule_moves_to_mmol() {
        let therapy = TherapyProfile {
            sens: vec![ScheduleEntry::new("00:00", 50.0), ScheduleEntry::new("12:00", 36.0)],
            carbratio: vec![ScheduleEntry::new("00:00", 10.0)],
            units: Some("mg/dl".into()),
            ..Default::default()
        };
        let pump = PumpProfile::from_therapy(&therapy, InsulinCurve::RapidActing, 4.0);
        let recs = [Recommendation::new(ISF_PARAMETER, 50.0, 45.0)];
        let adjusted = apply_recommendations(&recs, &pump);

        assert_eq!(adjusted.isf_profile.units, GlucoseUnit::Mmol);
        assert_eq!(adjusted.isf_profile.sensitivities[0].sensitivity, 2.5);
        assert_eq!(adjusted.isf_profile.sensitivities[1].sensitivity, 2.0);

        let back = adjusted.to_therapy(&therapy);
        assert_eq!(back.sens[0].value, Some(45.0));
        assert_eq!(back.sens[1].value, Some(36.0));
        assert_eq!(back.units.as_deref(), Some("mg/dl"));
    }

    #[test]
    fn mmol_profiles_are_not_divided_again() {
        let therapy = TherapyProfile {
            sens: vec![ScheduleEntry::new("00:00", 2.8)],
            carbratio: vec![ScheduleEntry::new("00:00", 10.0)],
            units: Some("mmol".into()),
            ..Default::default()
        };
        let pump = PumpProfile::from_therapy(&therapy, InsulinCurve::RapidActing, 4.0);
        let recs = [Recommendation::new(ISF_PARAMETER, 2.8, 2.52)];
        let adjusted = apply_recommendations(&recs, &pump);
        assert_eq!(adjusted.isf_profile.sensitivities[0].sensitivity, 2.5);
        assert_eq!(adjusted.to_therapy(&therapy).sens[0].value, Some(2.5));
    }

    #[test]
    fn carb_ratio_updates_schedule_and_mirror() {
        let recs = [Recommendation::new(CARB_RATIO_PARAMETER, 10.0, 11.26)];
        let adjusted = apply_recommendations(&recs, &profile());
        assert_eq!(adjusted.carb_ratios.schedule[0].ratio, 11.3);
        assert_eq!(adjusted.carb_ratio, 11.3);
    }

    #[test]
    fn hour_rows_replace_basal_schedule() {
        let recs = [
            Recommendation::new("13:00", 1.0, 1.1),
            Recommendation::new("02:00", 0.8, 0.881),
            Recommendation::new("24:00", 1.0, 1.0),
            Recommendation::new("-01:00", 1.0, 1.0),
            Recommendation::new("Note", 1.0, 1.0),
            Recommendation::new("1200", 1.0, 1.0),
            Recommendation::new("07:30:59", 1.0, 1.23),
        ];
        let adjusted = apply_recommendations(&recs, &profile());
        let hours: Vec<u32> = adjusted.basalprofile.iter().map(|s| s.i).collect();
        assert_eq!(hours, vec![2, 7, 13]);
        assert_eq!(adjusted.basalprofile[0].rate, 0.88);
        assert_eq!(adjusted.basalprofile[1].start, "07:00:00");
        assert_eq!(adjusted.basalprofile[1].minutes, 420.0);
        assert_eq!(adjusted.basalprofile[2].rate, 1.1);
    }

    #[test]
    fn malformed_labels_are_skipped() {
        let recs = [Recommendation::new("1_:00", 1.0, 2.0), Recommendation::new("03:00", 1.0, 0.5)];
        let adjusted = apply_recommendations(&recs, &profile());
        assert_eq!(adjusted.basalprofile.len(), 1);
        assert_eq!(adjusted.basalprofile[0].i, 3);
    }

    #[test]
    fn no_hour_rows_keeps_existing_basal() {
        let original = profile();
        let recs = [Recommendation::new(ISF_PARAMETER, 50.0, 45.0)];
        let adjusted = apply_recommendations(&recs, &original);
        assert_eq!(adjusted.basalprofile, original.basalprofile);
    }

    #[test]
    fn failed_merge_returns_original() {
        let original = profile();
        let recs = [
            Recommendation::new(ISF_PARAMETER, 50.0, 45.0),
            Recommendation::new("05:00", 1.0, f64::NAN),
        ];
        assert!(matches!(try_apply(&recs, &original), Err(ApplyError::NonFinite { .. })));
        assert_eq!(apply_recommendations(&recs, &original), original);

        let mut empty = original.clone();
        empty.isf_profile.sensitivities.clear();
        let recs = [Recommendation::new(ISF_PARAMETER, 50.0, 45.0)];
        assert_eq!(try_apply(&recs, &empty), Err(ApplyError::MissingEntry("sensitivity")));
        assert_eq!(apply_recommendations(&recs, &empty), empty);
    }
}
