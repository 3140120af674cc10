//! Resolves the dashboard's time-window query parameters into concrete bounds.
//!
//! Precedence is explicit `startDate` + `endDate`, then `year`, then the
//! `timeRange` keyword. An unknown or missing keyword means the trailing 30
//! days. Unparseable dates are not rejected: the affected bound becomes
//! `None`, binds as SQL `NULL`, and every range-scoped query simply matches
//! no rows.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Window used when no recognised keyword, year, or date pair is given.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Raw `?timeRange=&year=&startDate=&endDate=` parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub time_range: Option<String>,
    pub year: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeRange {
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "day" => Some(TimeRange::Day),
            "week" => Some(TimeRange::Week),
            "month" => Some(TimeRange::Month),
            "year" => Some(TimeRange::Year),
            "all" => Some(TimeRange::All),
            _ => None,
        }
    }
}

/// Resolved inclusive window. `None` marks a bound that could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn is_valid(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s <= e)
    }
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve the query against the current instant.
pub fn resolve(query: &DateRangeQuery, now: DateTime<Utc>) -> DateRange {
    if let (Some(start), Some(end)) = (non_empty(&query.start_date), non_empty(&query.end_date)) {
        return DateRange {
            start: parse_bound(start, Bound::Start),
            end: parse_bound(end, Bound::End),
        };
    }

    if let Some(year) = non_empty(&query.year) {
        return year_window(year);
    }

    let start = match non_empty(&query.time_range).and_then(TimeRange::parse) {
        Some(TimeRange::Day) => now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc()),
        Some(TimeRange::Week) => Some(now - Duration::days(7)),
        Some(TimeRange::Month) => now.checked_sub_months(Months::new(1)),
        Some(TimeRange::Year) => now.checked_sub_months(Months::new(12)),
        Some(TimeRange::All) => DateTime::from_timestamp(0, 0),
        None => Some(now - Duration::days(DEFAULT_WINDOW_DAYS)),
    };

    DateRange {
        start,
        end: Some(now),
    }
}

/// `[Y-01-01T00:00:00Z, Y-12-31T23:59:59Z]`, or an empty window if `year` is not a year.
pub fn year_window(year: &str) -> DateRange {
    let Ok(year) = year.trim().parse::<i32>() else {
        return DateRange {
            start: None,
            end: None,
        };
    };
    DateRange {
        start: NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc()),
        end: NaiveDate::from_ymd_opt(year, 12, 31)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc()),
    }
}

/// Calendar year used for the per-month revenue chart.
pub fn selected_year(query: &DateRangeQuery, now: DateTime<Utc>) -> i32 {
    non_empty(&query.year)
        .and_then(|y| y.parse().ok())
        .unwrap_or_else(|| now.year())
}

/// RFC 3339 timestamps are taken as-is; bare `YYYY-MM-DD` dates cover the whole day.
fn parse_bound(value: &str, bound: Bound) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let time = match bound {
        Bound::Start => date.and_hms_opt(0, 0, 0),
        Bound::End => date.and_hms_opt(23, 59, 59),
    };
    time.map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 14, 30, 0).unwrap()
    }

    fn query(time_range: Option<&str>, year: Option<&str>, start: Option<&str>, end: Option<&str>) -> DateRangeQuery {
        DateRangeQuery {
            time_range: time_range.map(String::from),
            year: year.map(String::from),
            start_date: start.map(String::from),
            end_date: end.map(String::from),
        }
    }

    #[test]
    fn unknown_keyword_falls_back_to_thirty_days() {
        for keyword in [Some("fortnight"), Some("DAY"), Some(""), None] {
            let range = resolve(&query(keyword, None, None, None), now());
            assert_eq!(range.start, Some(now() - Duration::days(30)), "keyword {keyword:?}");
            assert_eq!(range.end, Some(now()));
        }
    }

    #[test]
    fn keyword_windows() {
        let day = resolve(&query(Some("day"), None, None, None), now());
        assert_eq!(day.start, Some(Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap()));

        let week = resolve(&query(Some("week"), None, None, None), now());
        assert_eq!(week.start, Some(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap()));

        let month = resolve(&query(Some("month"), None, None, None), now());
        assert_eq!(month.start, Some(Utc.with_ymd_and_hms(2025, 2, 15, 14, 30, 0).unwrap()));

        let year = resolve(&query(Some("year"), None, None, None), now());
        assert_eq!(year.start, Some(Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap()));

        let all = resolve(&query(Some("all"), None, None, None), now());
        assert_eq!(all.start, Some(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(all.end, Some(now()));
    }

    #[test]
    fn year_resolves_to_full_calendar_year() {
        let range = resolve(&query(Some("week"), Some("2024"), None, None), now());
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(range.end, Some(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()));
    }

    #[test]
    fn explicit_dates_take_precedence() {
        let range = resolve(
            &query(Some("day"), Some("2020"), Some("2025-01-10"), Some("2025-01-20")),
            now(),
        );
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap()));
        assert_eq!(range.end, Some(Utc.with_ymd_and_hms(2025, 1, 20, 23, 59, 59).unwrap()));
    }

    #[test]
    fn rfc3339_bounds_are_kept_exact() {
        let range = resolve(
            &query(None, None, Some("2025-01-10T08:00:00+01:00"), Some("2025-01-10T10:00:00Z")),
            now(),
        );
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2025, 1, 10, 7, 0, 0).unwrap()));
        assert_eq!(range.end, Some(Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap()));
    }

    #[test]
    fn single_explicit_date_is_ignored() {
        let range = resolve(&query(Some("week"), None, Some("2025-01-10"), None), now());
        assert_eq!(range.start, Some(now() - Duration::days(7)));
    }

    #[test]
    fn malformed_dates_produce_empty_window() {
        let range = resolve(&query(None, None, Some("yesterday"), Some("2025-13-45")), now());
        assert_eq!(range.start, None);
        assert_eq!(range.end, None);
        assert!(!range.is_valid());

        let year = resolve(&query(None, Some("twenty"), None, None), now());
        assert!(!year.is_valid());
    }

    #[test]
    fn selected_year_defaults_to_current() {
        assert_eq!(selected_year(&DateRangeQuery::default(), now()), 2025);
        assert_eq!(selected_year(&query(None, Some("2023"), None, None), now()), 2023);
        assert_eq!(selected_year(&query(None, Some("x"), None, None), now()), 2025);
    }
}
