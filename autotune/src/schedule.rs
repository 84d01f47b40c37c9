//! Time-of-day schedule helpers shared by the recommendation engine and the
//! pump-profile conversion.

use nightscout_ingestor::models::profile::ScheduleEntry;
use thiserror::Error;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Error, PartialEq)]
#[error("Malformed time label {0:?}")]
pub struct TimeLabelError(pub String);

/// Parses `HH:MM` or `HH:MM:SS` into minutes since midnight.
pub fn parse_time_label(label: &str) -> Result<u32, TimeLabelError> {
    let err = || TimeLabelError(label.to_string());
    let mut parts = label.trim().split(':');
    let hours: u32 = parts.next().and_then(|h| h.parse().ok()).ok_or_else(err)?;
    let minutes: u32 = parts.next().and_then(|m| m.parse().ok()).ok_or_else(err)?;
    if let Some(seconds) = parts.next() {
        seconds.parse::<u32>().map_err(|_| err())?;
    }
    if parts.next().is_some() || hours > 23 || minutes > 59 {
        return Err(err());
    }
    Ok(hours * 60 + minutes)
}

/// Formats minutes since midnight as `HH:MM:00`.
pub fn format_start(minutes: u32) -> String {
    format!("{:02}:{:02}:00", minutes / 60, minutes % 60)
}

/// A schedule row whose label and value both parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedValue {
    pub minutes: u32,
    pub value: f64,
}

/// Parses and orders a schedule, skipping rows with bad labels or values.
pub fn parse_schedule(entries: &[ScheduleEntry], schedule: &str) -> Vec<TimedValue> {
    let mut parsed: Vec<TimedValue> = entries
        .iter()
        .filter_map(|entry| {
            let minutes = match parse_time_label(&entry.time) {
                Ok(minutes) => minutes,
                Err(e) => {
                    tracing::warn!(schedule, error = %e, "skipping schedule row");
                    return None;
                }
            };
            let Some(value) = entry.value else {
                tracing::warn!(schedule, time = %entry.time, "skipping schedule row without a numeric value");
                return None;
            };
            Some(TimedValue { minutes, value })
        })
        .collect();
    parsed.sort_by_key(|row| row.minutes);
    parsed
}

/// Value in effect at `minutes` since midnight.
///
/// Before the first row the schedule wraps around to the last row of the day.
pub fn value_at(schedule: &[TimedValue], minutes: u32) -> Option<f64> {
    schedule
        .iter()
        .rev()
        .find(|row| row.minutes <= minutes)
        .or_else(|| schedule.last())
        .map(|row| row.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels() {
        assert_eq!(parse_time_label("00:00"), Ok(0));
        assert_eq!(parse_time_label("06:30"), Ok(390));
        assert_eq!(parse_time_label("23:00:00"), Ok(1380));
        assert_eq!(parse_time_label(" 7:05 "), Ok(425));
    }

    #[test]
    fn rejects_malformed_labels() {
        for bad in ["", "noon", "24:00", "12:60", "12", "12:00:xx", "1:2:3:4"] {
            assert!(parse_time_label(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn schedule_is_sorted_and_filtered() {
        let entries = vec![
            ScheduleEntry::new("12:00", 0.9),
            ScheduleEntry::new("bogus", 1.0),
            ScheduleEntry::new("00:00", 0.7),
            ScheduleEntry {
                value: None,
                ..ScheduleEntry::new("06:00", 0.0)
            },
        ];
        let parsed = parse_schedule(&entries, "basal");
        assert_eq!(
            parsed,
            vec![
                TimedValue { minutes: 0, value: 0.7 },
                TimedValue { minutes: 720, value: 0.9 },
            ]
        );
    }

    #[test]
    fn lookup_wraps_before_first_row() {
        let schedule = vec![
            TimedValue { minutes: 60, value: 0.5 },
            TimedValue { minutes: 600, value: 0.8 },
        ];
        assert_eq!(value_at(&schedule, 0), Some(0.8));
        assert_eq!(value_at(&schedule, 60), Some(0.5));
        assert_eq!(value_at(&schedule, 599), Some(0.5));
        assert_eq!(value_at(&schedule, 1439), Some(0.8));
        assert_eq!(value_at(&[], 0), None);
    }

    #[test]
    fn start_formatting() {
        assert_eq!(format_start(0), "00:00:00");
        assert_eq!(format_start(390), "06:30:00");
    }
}
