//! Records "now" into the shard of the current activity day.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::day::{DayBoundary, truncate_to_second};
use crate::error::ErrorCode;
use crate::shard::shard_path;
use crate::signal::{SignalError, SuppressionSignal};
use crate::store::{EventStore, StoreError};

/// Failures that stop a record attempt.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RecordError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Signal(e) => e.code(),
            Self::Store(e) => e.code(),
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// What a successful [`Recorder::record`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new event was stored.
    Recorded { at: NaiveDateTime, shard: PathBuf },
    /// This second was already stored; nothing changed.
    AlreadyRecorded { at: NaiveDateTime, shard: PathBuf },
    /// The suppression signal was active; nothing was touched.
    Suppressed,
}

impl RecordOutcome {
    /// Short label for logs and JSON output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Recorded { .. } => "recorded",
            Self::AlreadyRecorded { .. } => "already_recorded",
            Self::Suppressed => "suppressed",
        }
    }
}

/// Records activity with an injected clock and suppression signal.
pub struct Recorder<C, S> {
    shard_dir: PathBuf,
    boundary: DayBoundary,
    clock: C,
    signal: S,
}

impl<C: Clock, S: SuppressionSignal> Recorder<C, S> {
    #[must_use]
    pub fn new(shard_dir: impl Into<PathBuf>, boundary: DayBoundary, clock: C, signal: S) -> Self {
        Self {
            shard_dir: shard_dir.into(),
            boundary,
            clock,
            signal,
        }
    }

    /// Directory holding the day shards.
    #[must_use]
    pub fn shard_dir(&self) -> &Path {
        &self.shard_dir
    }

    /// Record the current instant unless suppressed.
    ///
    /// A second that is already stored is reported as
    /// [`RecordOutcome::AlreadyRecorded`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Signal`] if the suppression check fails (nothing
    /// is recorded), or [`RecordError::Store`] if the shard cannot be opened
    /// or written.
    pub fn record(&self) -> Result<RecordOutcome, RecordError> {
        if self.signal.is_suppressed()? {
            debug!("recording suppressed");
            return Ok(RecordOutcome::Suppressed);
        }

        let at = truncate_to_second(self.clock.now());
        let shard = shard_path(&self.shard_dir, self.boundary.day_of(at));
        let store = EventStore::open(&shard)?;

        match store.record_event(at) {
            Ok(()) => {
                info!(%at, shard = %shard.display(), "recorded activity");
                Ok(RecordOutcome::Recorded { at, shard })
            }
            Err(err) if err.is_duplicate() => {
                debug!(%at, shard = %shard.display(), "second already recorded");
                Ok(RecordOutcome::AlreadyRecorded { at, shard })
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::day::parse_timestamp;
    use crate::signal::NeverSuppressed;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).expect("valid timestamp")
    }

    fn stored(path: &Path) -> u64 {
        EventStore::open_existing(path)
            .expect("shard exists")
            .count()
            .expect("count")
    }

    #[test]
    fn records_into_the_shifted_day_shard() {
        let tmp = TempDir::new().expect("tempdir");
        let recorder = Recorder::new(
            tmp.path(),
            DayBoundary::default(),
            FixedClock(ts("2024-03-02 04:59:59")),
            NeverSuppressed,
        );

        let outcome = recorder.record().expect("record");
        let shard = tmp.path().join("20240301.db");
        assert_eq!(
            outcome,
            RecordOutcome::Recorded {
                at: ts("2024-03-02 04:59:59"),
                shard: shard.clone(),
            }
        );
        assert_eq!(stored(&shard), 1);
    }

    #[test]
    fn second_record_in_same_second_is_already_recorded() {
        let tmp = TempDir::new().expect("tempdir");
        let recorder = Recorder::new(
            tmp.path(),
            DayBoundary::default(),
            FixedClock(ts("2024-03-01 12:00:00")),
            NeverSuppressed,
        );

        assert_eq!(recorder.record().expect("first").label(), "recorded");
        let second = recorder.record().expect("second is benign");
        assert!(matches!(second, RecordOutcome::AlreadyRecorded { .. }));
        assert_eq!(stored(&tmp.path().join("20240301.db")), 1);
    }

    #[test]
    fn suppressed_records_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let recorder = Recorder::new(
            tmp.path(),
            DayBoundary::default(),
            FixedClock(ts("2024-03-01 12:00:00")),
            || -> Result<bool, SignalError> { Ok(true) },
        );

        assert_eq!(recorder.record().expect("no-op"), RecordOutcome::Suppressed);
        assert!(!tmp.path().join("20240301.db").exists());
    }

    #[test]
    fn signal_failure_propagates_without_recording() {
        let tmp = TempDir::new().expect("tempdir");
        let recorder = Recorder::new(
            tmp.path(),
            DayBoundary::default(),
            FixedClock(ts("2024-03-01 12:00:00")),
            || -> Result<bool, SignalError> { Err(SignalError::new("ps failed")) },
        );

        let err = recorder.record().expect_err("must fail");
        assert_eq!(err.code(), ErrorCode::SignalUnavailable);
        assert!(!tmp.path().join("20240301.db").exists());
    }

    #[test]
    fn signal_is_evaluated_on_every_call() {
        let tmp = TempDir::new().expect("tempdir");
        let calls = Cell::new(0_u32);
        let signal = || -> Result<bool, SignalError> {
            calls.set(calls.get() + 1);
            Ok(calls.get() > 1)
        };
        let recorder = Recorder::new(
            tmp.path(),
            DayBoundary::default(),
            FixedClock(ts("2024-03-01 12:00:00")),
            signal,
        );

        assert_eq!(recorder.record().expect("first").label(), "recorded");
        assert_eq!(recorder.record().expect("second"), RecordOutcome::Suppressed);
        assert_eq!(calls.get(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_shard_dir_is_an_error() {
        let tmp = TempDir::new().expect("tempdir");
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"file").expect("write");
        let recorder = Recorder::new(
            blocker.join("shards"),
            DayBoundary::default(),
            FixedClock(ts("2024-03-01 12:00:00")),
            NeverSuppressed,
        );

        let err = recorder.record().expect_err("must fail");
        assert_eq!(err.code(), ErrorCode::ShardUnavailable);
    }
}
