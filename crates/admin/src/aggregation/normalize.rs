//! Record normalization: dates and month buckets.
//!
//! Currency parsing lives in [`chosen_one_core::Price`]. This module turns
//! the `orderDate` text into a calendar month. Nothing here fails: an
//! unreadable date yields `None` and the record drops out of date-bucketed
//! metrics only.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Serialize, Serializer};

/// Calendar month bucket.
///
/// Renders unpadded (`"2023-5"`) but orders chronologically by
/// `(year, month)`, so `"2023-10"` sorts after `"2023-9"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Build a key; `month` is 1-based. Returns `None` outside 1..=12.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    fn of<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl Ord for MonthKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.month).cmp(&(other.year, other.month))
    }
}

impl PartialOrd for MonthKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A parsed `orderDate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDate {
    /// A date with no time of day (`2023-05-01`). Taken as written.
    Calendar(NaiveDate),
    /// Wall-clock time with no offset. Taken as local time.
    Wall(NaiveDateTime),
    /// An absolute instant with an offset (`...Z`, `...+02:00`).
    Instant(DateTime<chrono::FixedOffset>),
}

impl OrderDate {
    /// Parse ISO-8601 date or date-time text.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self::Instant(at));
        }
        if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Self::Calendar(day));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .into_iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(Self::Wall)
    }

    /// Month this date falls in, as seen from `tz`.
    #[must_use]
    pub fn month_in<Tz: TimeZone>(&self, tz: &Tz) -> MonthKey {
        match self {
            Self::Calendar(day) => MonthKey::of(day),
            Self::Wall(at) => MonthKey::of(at),
            Self::Instant(at) => MonthKey::of(&at.with_timezone(tz)),
        }
    }

    /// Instant used for newest-first sorting. Calendar and wall dates are
    /// read as UTC, which is close enough for ordering.
    #[must_use]
    pub fn sort_key(&self) -> NaiveDateTime {
        match self {
            Self::Calendar(day) => day.and_time(chrono::NaiveTime::MIN),
            Self::Wall(at) => *at,
            Self::Instant(at) => at.naive_utc(),
        }
    }
}

/// Month bucket of an optional `orderDate`, in `tz`.
#[must_use]
pub fn month_key<Tz: TimeZone>(raw: Option<&str>, tz: &Tz) -> Option<MonthKey> {
    raw.and_then(OrderDate::parse).map(|d| d.month_in(tz))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{FixedOffset, Utc};

    use super::*;

    fn key(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    #[test]
    fn test_label_is_unpadded() {
        assert_eq!(key(2023, 5).to_string(), "2023-5");
        assert_eq!(key(2023, 12).to_string(), "2023-12");
        assert_eq!(serde_json::to_string(&key(2024, 1)).unwrap(), "\"2024-1\"");
    }

    #[test]
    fn test_ordering_is_chronological() {
        let mut keys = vec![key(2023, 10), key(2024, 1), key(2023, 9), key(2023, 2)];
        keys.sort();
        let labels: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(labels, ["2023-2", "2023-9", "2023-10", "2024-1"]);
    }

    #[test]
    fn test_invalid_month() {
        assert!(MonthKey::new(2023, 0).is_none());
        assert!(MonthKey::new(2023, 13).is_none());
    }

    #[test]
    fn test_calendar_dates_ignore_timezone() {
        let east = FixedOffset::east_opt(14 * 3600).unwrap();
        let west = FixedOffset::west_opt(12 * 3600).unwrap();
        assert_eq!(month_key(Some("2023-05-01"), &east), Some(key(2023, 5)));
        assert_eq!(month_key(Some("2023-05-01"), &west), Some(key(2023, 5)));
    }

    #[test]
    fn test_instants_shift_into_local_month() {
        let raw = Some("2023-05-31T23:30:00.000Z");
        assert_eq!(month_key(raw, &Utc), Some(key(2023, 5)));
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(month_key(raw, &plus_two), Some(key(2023, 6)));
    }

    #[test]
    fn test_wall_clock_times() {
        let west = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(month_key(Some("2023-07-31T23:59:00"), &west), Some(key(2023, 7)));
        assert_eq!(month_key(Some("2023-07-01T08:15"), &Utc), Some(key(2023, 7)));
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(month_key(None, &Utc), None);
        assert_eq!(month_key(Some(""), &Utc), None);
        assert_eq!(month_key(Some("May 5th"), &Utc), None);
        assert_eq!(month_key(Some("2023-13-01"), &Utc), None);
    }

    #[test]
    fn test_sort_key() {
        let a = OrderDate::parse("2023-05-01").unwrap().sort_key();
        let b = OrderDate::parse("2023-05-01T10:00:00Z").unwrap().sort_key();
        assert!(a < b);
    }
}
