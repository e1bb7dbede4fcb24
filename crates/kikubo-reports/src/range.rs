use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use crate::error::{ReportError, ReportResult};

/// Days covered by a report when no start date is given.
pub const DEFAULT_SPAN_DAYS: u64 = 30;

/// Inclusive calendar-day range, in UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ReportResult<Self> {
        if start > end {
            return Err(ReportError::invalid(
                "start_date",
                "start_date must not be after end_date.",
            ));
        }
        Ok(Self { start, end })
    }

    /// The last [`DEFAULT_SPAN_DAYS`] days up to and including `today`.
    pub fn trailing(today: NaiveDate, days: u64) -> Self {
        Self {
            start: today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN),
            end: today,
        }
    }

    /// Build from `start_date` / `end_date` query values (`YYYY-MM-DD`).
    /// Missing values default to the trailing window ending today.
    pub fn from_query(
        start: Option<&str>,
        end: Option<&str>,
        today: NaiveDate,
    ) -> ReportResult<Self> {
        let fallback = Self::trailing(today, DEFAULT_SPAN_DAYS);
        let start = parse_day("start_date", start)?.unwrap_or(fallback.start);
        let end = parse_day("end_date", end)?.unwrap_or(fallback.end);
        Self::new(start, end)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.start <= day && day <= self.end
    }
}

fn parse_day(field: &'static str, raw: Option<&str>) -> ReportResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ReportError::invalid(field, format!("\"{s}\" is not a YYYY-MM-DD date."))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_to_trailing_thirty_days() {
        let range = DateRange::from_query(None, None, day(2024, 3, 31)).unwrap();
        assert_eq!(range.start, day(2024, 3, 1));
        assert_eq!(range.end, day(2024, 3, 31));
    }

    #[test]
    fn explicit_bounds_are_inclusive() {
        let range = DateRange::from_query(Some("2024-01-01"), Some("2024-01-02"), day(2024, 3, 31)).unwrap();
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 1, 2, 23, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()));
    }

    #[test]
    fn rejects_bad_dates() {
        let today = day(2024, 3, 31);
        assert!(matches!(
            DateRange::from_query(Some("03/01/2024"), None, today),
            Err(ReportError::InvalidParameter { field: "start_date", .. })
        ));
        assert!(DateRange::from_query(Some("2024-02-01"), Some("2024-01-01"), today).is_err());
    }
}
