//! The calendar window a run covers and the fetch bounds derived from it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::tz;

#[derive(Debug, Error, PartialEq)]
pub enum WindowError {
    #[error("End date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("End date {0} is out of range")]
    OutOfRange(NaiveDate),
}

/// An inclusive range of calendar dates interpreted in one time zone.
///
/// Fetch bounds run from local midnight of `start_date` to local midnight of
/// the day after `end_date`, so the whole end date is covered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchWindow {
    start_date: NaiveDate,
    end_date: NaiveDate,
    end_exclusive: NaiveDate,
    timezone: Tz,
}

impl FetchWindow {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, timezone: Tz) -> Result<Self, WindowError> {
        if end_date < start_date {
            return Err(WindowError::EndBeforeStart {
                start: start_date,
                end: end_date,
            });
        }
        let end_exclusive = end_date
            .succ_opt()
            .ok_or(WindowError::OutOfRange(end_date))?;
        Ok(Self {
            start_date,
            end_date,
            end_exclusive,
            timezone,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Lower fetch bound (inclusive).
    pub fn start_utc(&self) -> DateTime<Utc> {
        tz::resolve_local(midnight(self.start_date), self.timezone)
    }

    /// Upper fetch bound: local midnight after the end date.
    pub fn end_utc(&self) -> DateTime<Utc> {
        tz::resolve_local(midnight(self.end_exclusive), self.timezone)
    }

    /// Number of calendar days covered.
    pub fn days(&self) -> i64 {
        (self.end_exclusive - self.start_date).num_days()
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn end_date_is_extended_by_one_day() {
        let w = FetchWindow::new(date(2025, 11, 4), date(2025, 11, 5), Tz::UTC).unwrap();
        assert_eq!(w.start_utc(), Utc.with_ymd_and_hms(2025, 11, 4, 0, 0, 0).unwrap());
        assert_eq!(w.end_utc(), Utc.with_ymd_and_hms(2025, 11, 6, 0, 0, 0).unwrap());
        assert_eq!(w.days(), 2);
    }

    #[test]
    fn single_day_window() {
        let w = FetchWindow::new(date(2025, 11, 4), date(2025, 11, 4), Tz::UTC).unwrap();
        assert_eq!(w.days(), 1);
    }

    #[test]
    fn bounds_follow_time_zone() {
        let tz = tz::parse_tz("Europe/Amsterdam").unwrap();
        let w = FetchWindow::new(date(2025, 1, 10), date(2025, 1, 10), tz).unwrap();
        assert_eq!(w.start_utc(), Utc.with_ymd_and_hms(2025, 1, 9, 23, 0, 0).unwrap());
        assert_eq!(w.end_utc(), Utc.with_ymd_and_hms(2025, 1, 10, 23, 0, 0).unwrap());
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = FetchWindow::new(date(2025, 11, 5), date(2025, 11, 4), Tz::UTC).unwrap_err();
        assert!(matches!(err, WindowError::EndBeforeStart { .. }));
    }
}
