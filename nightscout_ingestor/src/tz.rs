//! Time zone helpers for turning calendar dates into fetch bounds and fetched
//! instants back into wall-clock times.
//!
//! Nightscout stores instants (epoch milliseconds or RFC-3339 with offset). The
//! engine works on naive wall-clock times so that hour-of-day buckets line up
//! with the pump's basal schedule. With `UTC` the wall clock is plain UTC.
//!
//! Notes:
//! - Ambiguous local times happen during "fall back" when a wall time occurs twice;
//!   the earlier instant is used.
//! - Nonexistent local times happen during "spring forward"; the time is nudged
//!   forward minute by minute (capped at 3 hours) to the first valid instant.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Unknown time zone: {0}")]
pub struct UnknownTimeZone(pub String);

/// Parse an IANA time zone name such as "Europe/Amsterdam".
pub fn parse_tz(name: &str) -> Result<Tz, UnknownTimeZone> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| UnknownTimeZone(name.to_string()))
}

/// Resolve a local wall-clock time to a UTC instant, never failing.
///
/// See the module notes for how DST gaps and overlaps are resolved. If no valid
/// instant is found within the cap, the naive value is taken as UTC.
pub fn resolve_local(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let mut t = naive;
            for _ in 0..180 {
                t += chrono::Duration::minutes(1);
                if let LocalResult::Single(dt) = tz.from_local_datetime(&t) {
                    return dt.with_timezone(&Utc);
                }
            }
            Utc.from_utc_datetime(&naive)
        }
    }
}

/// Express a UTC instant as naive wall-clock time in `tz`.
pub fn to_wall_clock(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Epoch milliseconds to naive wall-clock time in `tz`.
pub fn millis_to_wall_clock(millis: i64, tz: Tz) -> Option<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| to_wall_clock(dt, tz))
}

/// Parse a Nightscout `created_at` string and express it as wall-clock time in `tz`.
///
/// Accepts RFC-3339 with an offset; strings without an offset are taken as UTC.
pub fn parse_created_at(raw: &str, tz: Tz) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(to_wall_clock(dt.with_timezone(&Utc), tz));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| to_wall_clock(Utc.from_utc_datetime(&naive), tz))
}

/// Format a UTC datetime as an RFC-3339 string with millisecond precision.
pub fn to_rfc3339_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn utc_wall_clock_is_identity() {
        let got = resolve_local(naive(2025, 3, 1, 0, 0), Tz::UTC);
        assert_eq!(got, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(to_wall_clock(got, Tz::UTC), naive(2025, 3, 1, 0, 0));
    }

    #[test]
    fn spring_forward_gap_shifts_to_first_valid_minute() {
        // America/New_York skips 02:00-03:00 on 2024-03-10; 03:00 EDT is 07:00Z.
        let tz = parse_tz("America/New_York").unwrap();
        let got = resolve_local(naive(2024, 3, 10, 2, 30), tz);
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap());
    }

    #[test]
    fn fall_back_overlap_prefers_earliest() {
        // 2024-11-03 01:30 occurs twice in New York; the EDT one is 05:30Z.
        let tz = parse_tz("America/New_York").unwrap();
        let got = resolve_local(naive(2024, 11, 3, 1, 30), tz);
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap());
    }

    #[test]
    fn created_at_formats() {
        let tz = parse_tz("Europe/Amsterdam").unwrap();
        assert_eq!(
            parse_created_at("2025-01-15T08:00:00.000Z", tz),
            Some(naive(2025, 1, 15, 9, 0))
        );
        assert_eq!(
            parse_created_at("2025-01-15T08:00:00+01:00", Tz::UTC),
            Some(naive(2025, 1, 15, 7, 0))
        );
        assert_eq!(
            parse_created_at("2025-01-15T08:00:00", Tz::UTC),
            Some(naive(2025, 1, 15, 8, 0))
        );
        assert_eq!(parse_created_at("yesterday", Tz::UTC), None);
    }

    #[test]
    fn millis_conversion() {
        // 2025-01-15T08:00:00Z
        let ms = 1_736_928_000_000;
        assert_eq!(millis_to_wall_clock(ms, Tz::UTC), Some(naive(2025, 1, 15, 8, 0)));
    }

    #[test]
    fn bad_zone_name() {
        assert!(parse_tz("Mars/Olympus").is_err());
    }
}
