//! Fixed-width activity histogram over one activity day.
//!
//! The window is `[day + offset, day + offset + 24h - 1s]`. Rows start at the
//! window start and step by the interval; every row is emitted, empty ones
//! included, and the last row covers whatever partial span remains:
//!
//! ```text
//! interval = 300
//! [2024-03-01 05:00:00]: **
//! [2024-03-01 05:05:00]: *
//! [2024-03-01 05:10:00]:
//! ...
//! [2024-03-02 04:55:00]:
//! ```
//!
//! For intervals dividing an hour the window start is a multiple of the
//! interval in epoch seconds, so each row is also the absolute bucket
//! (`epoch - epoch % interval`) of the events it counts.

use std::io::{self, Write};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::day::{DAY_SECONDS, DayBoundary, format_timestamp};
use crate::error::ErrorCode;
use crate::store::{EventStore, StoreError};

/// Default bucket width in seconds.
pub const DEFAULT_INTERVAL_SECS: u32 = 300;

/// Mark printed once per event.
pub const MARK: &str = "*";

/// Failures while building a histogram.
#[derive(Debug, thiserror::Error)]
pub enum HistogramError {
    #[error("interval must be a positive number of seconds")]
    InvalidInterval,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HistogramError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInterval => ErrorCode::InvalidInput,
            Self::Store(e) => e.code(),
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// One histogram row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    #[serde(serialize_with = "serialize_timestamp")]
    pub start: NaiveDateTime,
    pub count: u64,
}

/// Bucketed event counts for one activity day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    pub day: NaiveDate,
    pub interval_secs: u32,
    #[serde(serialize_with = "serialize_timestamp")]
    pub window_start: NaiveDateTime,
    #[serde(serialize_with = "serialize_timestamp")]
    pub window_end: NaiveDateTime,
    pub buckets: Vec<Bucket>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_timestamp<S: serde::Serializer>(
    t: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(*t))
}

impl Histogram {
    /// Total number of events across all rows.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// Write one `[timestamp]: marks` line per row.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        for bucket in &self.buckets {
            let marks = MARK.repeat(usize::try_from(bucket.count).unwrap_or(usize::MAX));
            writeln!(w, "[{}]: {marks}", format_timestamp(bucket.start))?;
        }
        Ok(())
    }
}

/// Number of rows in a day at `interval_secs`: `ceil(86400 / interval)`.
#[must_use]
pub fn bucket_count(interval_secs: u32) -> usize {
    let interval = i64::from(interval_secs.max(1));
    usize::try_from((DAY_SECONDS + interval - 1) / interval).unwrap_or(0)
}

/// Build the histogram of `day` from the events in `store`.
///
/// # Errors
///
/// Returns [`HistogramError::InvalidInterval`] when `interval_secs` is zero,
/// or the store error if the scan fails.
pub fn histogram(
    store: &EventStore,
    boundary: DayBoundary,
    day: NaiveDate,
    interval_secs: u32,
) -> Result<Histogram, HistogramError> {
    if interval_secs == 0 {
        return Err(HistogramError::InvalidInterval);
    }

    let (window_start, window_end) = boundary.window(day);
    let interval = i64::from(interval_secs);

    let mut counts = vec![0_u64; bucket_count(interval_secs)];
    let mut scan = store.scan_range(window_start, window_end)?;
    for event in scan.iter()? {
        let offset = (event? - window_start).num_seconds();
        let index = usize::try_from(offset / interval).ok();
        if let Some(slot) = index.and_then(|i| counts.get_mut(i)) {
            *slot += 1;
        }
    }

    let buckets = counts
        .into_iter()
        .zip(0_i64..)
        .map(|(count, i)| Bucket {
            start: window_start + TimeDelta::seconds(i * interval),
            count,
        })
        .collect();

    Ok(Histogram {
        day,
        interval_secs,
        window_start,
        window_end,
        buckets,
    })
}
