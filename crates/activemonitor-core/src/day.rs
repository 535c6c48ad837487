//! Activity-day arithmetic.
//!
//! An activity day does not start at midnight: it is the 24-hour window that
//! begins `offset_hours` after local midnight, so late-night activity lands on
//! the day it logically belongs to.
//!
//! ```text
//! offset = 5h
//!
//!   2024-03-01 05:00:00 ─────────────── 2024-03-02 04:59:59
//!   └────────────── activity day 2024-03-01 ──────────────┘
//! ```
//!
//! [`DayBoundary`] is the single source of truth for this rule. The recorder,
//! the histogram window and the legacy migration query all derive from it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

/// On-disk timestamp literal: second precision, no timezone.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date format accepted on the command line.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default shift of the day boundary past midnight.
pub const DEFAULT_DAY_OFFSET_HOURS: i64 = 5;

/// Length of an activity day in seconds.
pub const DAY_SECONDS: i64 = 86_400;

/// Maps instants to the activity day they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayBoundary {
    offset_hours: i64,
}

impl Default for DayBoundary {
    fn default() -> Self {
        Self {
            offset_hours: DEFAULT_DAY_OFFSET_HOURS,
        }
    }
}

impl DayBoundary {
    /// Create a boundary shifted `offset_hours` past midnight.
    ///
    /// Returns `None` unless `-23 <= offset_hours <= 23`.
    #[must_use]
    pub const fn new(offset_hours: i64) -> Option<Self> {
        if offset_hours > -24 && offset_hours < 24 {
            Some(Self { offset_hours })
        } else {
            None
        }
    }

    /// Configured offset in hours.
    #[must_use]
    pub const fn offset_hours(self) -> i64 {
        self.offset_hours
    }

    fn offset(self) -> TimeDelta {
        TimeDelta::hours(self.offset_hours)
    }

    /// The activity day containing `t`.
    #[must_use]
    pub fn day_of(self, t: NaiveDateTime) -> NaiveDate {
        (t - self.offset()).date()
    }

    /// Inclusive `[start, end]` window of `day`.
    #[must_use]
    pub fn window(self, day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = day.and_time(NaiveTime::MIN) + self.offset();
        let end = start + TimeDelta::seconds(DAY_SECONDS - 1);
        (start, end)
    }

    /// Grouping key for the activity day containing `t`: epoch seconds of that
    /// day's midnight, reading the naive value as UTC.
    #[must_use]
    pub fn day_key(self, t: NaiveDateTime) -> i64 {
        day_epoch(self.day_of(t))
    }

    /// The same shift as a SQLite date modifier (`"-5 hours"` for offset 5).
    #[must_use]
    pub fn sqlite_modifier(self) -> String {
        format!("{:+} hours", -self.offset_hours)
    }
}

/// Epoch seconds of `day` at 00:00:00, reading the naive value as UTC.
#[must_use]
pub fn day_epoch(day: NaiveDate) -> i64 {
    day.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Inverse of [`day_epoch`]. Returns `None` for out-of-range keys.
#[must_use]
pub fn day_from_key(key: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(key, 0).map(|dt| dt.date_naive())
}

/// Epoch seconds of a naive timestamp, read as UTC.
#[must_use]
pub fn epoch_seconds(t: NaiveDateTime) -> i64 {
    t.and_utc().timestamp()
}

/// Drop any sub-second component.
#[must_use]
pub fn truncate_to_second(t: NaiveDateTime) -> NaiveDateTime {
    t.with_nanosecond(0).unwrap_or(t)
}

/// Render `t` in the on-disk literal format.
#[must_use]
pub fn format_timestamp(t: NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse the on-disk literal format.
///
/// # Errors
///
/// Returns a parse error if `raw` is not `YYYY-MM-DD HH:MM:SS`.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns a parse error if `raw` is not a valid calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
}
