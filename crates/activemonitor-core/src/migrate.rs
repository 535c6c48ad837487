//! Legacy single-file store → day shards.
//!
//! The legacy store keeps every event ever recorded in one file. Migration
//! reads it once, groups events by destination activity day, and writes each
//! group into its own shard through a fixed pool of worker threads:
//!
//! ```text
//!   legacy.db ──scan_all──► { day_key → [timestamps] }
//!                                   │ one job per day
//!                                   ▼
//!                         ┌── job queue (channel) ──┐
//!                      worker 1   worker 2 …   worker N   (N ≤ max_workers)
//!                         │          │             │
//!                    20240301.db 20240302.db …  (own connection per job)
//! ```
//!
//! # Invariants
//!
//! - No more than `max_workers` shards are open for writing at once.
//! - A failing day does not stop other days; every job runs before the
//!   result is reported.
//! - A failing day stops at its first failed insert; rows inserted before it
//!   stay committed.
//! - Existing timestamps are not skipped: re-running a migration fails every
//!   day that was already migrated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::day::{DayBoundary, day_from_key};
use crate::error::ErrorCode;
use crate::shard::shard_path;
use crate::store::{EventStore, StoreError};

/// Default bound on concurrently migrating days.
pub const DEFAULT_MAX_WORKERS: usize = 10;

// ---------------------------------------------------------------------------
// Errors and report
// ---------------------------------------------------------------------------

/// One day that could not be fully migrated.
#[derive(Debug, thiserror::Error)]
#[error("day {day}: {source}")]
pub struct DayFailure {
    pub day: NaiveDate,
    /// Events of this day written before the failure.
    pub inserted: usize,
    #[source]
    pub source: StoreError,
}

/// Migration failures.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The legacy store could not be opened or read.
    #[error("cannot read legacy store: {0}")]
    Source(#[source] StoreError),

    /// A day key produced by the legacy query is not a valid date.
    #[error("legacy store produced an out-of-range day key {0}")]
    InvalidDayKey(i64),

    /// At least one day failed; the rest ran to completion.
    #[error("{failed} of {total} days failed to migrate; first failure: {first}")]
    GroupsFailed {
        failed: usize,
        total: usize,
        first: Box<DayFailure>,
        report: Box<MigrationReport>,
    },
}

impl MigrateError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Source(e) => e.code(),
            Self::InvalidDayKey(_) => ErrorCode::InternalUnexpected,
            Self::GroupsFailed { .. } => ErrorCode::MigrationFailed,
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// The full report when the migration ran but some days failed.
    #[must_use]
    pub fn report(&self) -> Option<&MigrationReport> {
        match self {
            Self::GroupsFailed { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Per-day result line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayResult {
    pub day: NaiveDate,
    pub shard: PathBuf,
    pub events: usize,
    pub inserted: usize,
    /// Failure message, if the day failed.
    pub error: Option<String>,
}

impl DayResult {
    /// Returns `true` if every event of the day was written.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a migration run, ordered by day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub source: PathBuf,
    pub events_seen: usize,
    pub events_migrated: usize,
    pub days: Vec<DayResult>,
    /// Most jobs observed running at the same time.
    pub peak_concurrency: usize,
}

impl MigrationReport {
    /// Number of days that failed.
    #[must_use]
    pub fn failed_days(&self) -> usize {
        self.days.iter().filter(|d| !d.is_ok()).count()
    }
}

// ---------------------------------------------------------------------------
// Migrator
// ---------------------------------------------------------------------------

struct DayJob {
    day: NaiveDate,
    events: Vec<String>,
}

struct JobResult {
    day: NaiveDate,
    shard: PathBuf,
    events: usize,
    inserted: usize,
    failure: Option<StoreError>,
}

/// Re-partitions a legacy store into day shards.
#[derive(Debug, Clone)]
pub struct Migrator {
    dest_dir: PathBuf,
    boundary: DayBoundary,
    max_workers: usize,
}

impl Migrator {
    /// Migrate into shards under `dest_dir` using `boundary` to assign days.
    #[must_use]
    pub fn new(dest_dir: impl Into<PathBuf>, boundary: DayBoundary) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            boundary,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }

    /// Override the worker bound (minimum 1).
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Configured worker bound.
    #[must_use]
    pub const fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run the migration from the legacy store at `legacy_path`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Source`] if the legacy store cannot be read
    /// (nothing is written), or [`MigrateError::GroupsFailed`] after all days
    /// have run if any of them failed.
    pub fn migrate(&self, legacy_path: &Path) -> Result<MigrationReport, MigrateError> {
        let legacy = EventStore::open_existing(legacy_path).map_err(MigrateError::Source)?;
        let rows = legacy.scan_all(self.boundary).map_err(MigrateError::Source)?;
        drop(legacy);

        let events_seen = rows.len();
        let mut groups: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for row in rows {
            groups.entry(row.day_key).or_default().push(row.timestamp);
        }

        let jobs = groups
            .into_iter()
            .map(|(key, events)| {
                day_from_key(key)
                    .map(|day| DayJob { day, events })
                    .ok_or(MigrateError::InvalidDayKey(key))
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            source = %legacy_path.display(),
            events = events_seen,
            days = jobs.len(),
            max_workers = self.max_workers,
            "starting migration"
        );

        let (mut results, peak_concurrency) = self.run_jobs(jobs);
        results.sort_by_key(|r| r.day);

        let mut report = MigrationReport {
            source: legacy_path.to_path_buf(),
            events_seen,
            events_migrated: 0,
            days: Vec::with_capacity(results.len()),
            peak_concurrency,
        };
        let mut first_failure = None;
        for result in results {
            report.events_migrated += result.inserted;
            report.days.push(DayResult {
                day: result.day,
                shard: result.shard,
                events: result.events,
                inserted: result.inserted,
                error: result.failure.as_ref().map(ToString::to_string),
            });
            if let Some(source) = result.failure.filter(|_| first_failure.is_none()) {
                first_failure = Some(DayFailure {
                    day: result.day,
                    inserted: result.inserted,
                    source,
                });
            }
        }

        info!(
            migrated = report.events_migrated,
            failed_days = report.failed_days(),
            peak_concurrency,
            "migration finished"
        );

        match first_failure {
            None => Ok(report),
            Some(first) => Err(MigrateError::GroupsFailed {
                failed: report.failed_days(),
                total: report.days.len(),
                first: Box::new(first),
                report: Box::new(report),
            }),
        }
    }

    /// Drain `jobs` through a pool of at most `max_workers` threads.
    ///
    /// Returns every job's result (unordered) and the peak number of jobs
    /// that were in flight together.
    fn run_jobs(&self, jobs: Vec<DayJob>) -> (Vec<JobResult>, usize) {
        let workers = self.max_workers.min(jobs.len());
        if workers == 0 {
            return (Vec::new(), 0);
        }

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<DayJob>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<JobResult>();
        let total = jobs.len();
        for job in jobs {
            // Receivers outlive this loop, so sending cannot fail.
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let in_flight = &in_flight;
                let peak = &peak;
                scope.spawn(move || {
                    for job in job_rx {
                        let running = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(running, Ordering::SeqCst);
                        debug!(worker, day = %job.day, events = job.events.len(), "migrating day");
                        let result = self.migrate_day(job);
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let results: Vec<JobResult> = result_rx.into_iter().collect();
        debug_assert_eq!(results.len(), total);
        (results, peak.load(Ordering::SeqCst))
    }

    fn migrate_day(&self, job: DayJob) -> JobResult {
        let shard = shard_path(&self.dest_dir, job.day);
        let events = job.events.len();
        let mut inserted = 0;

        let failure = match EventStore::open(&shard) {
            Ok(store) => job
                .events
                .iter()
                .try_for_each(|literal| {
                    store.record_raw(literal)?;
                    inserted += 1;
                    Ok::<(), StoreError>(())
                })
                .err(),
            Err(err) => Some(err),
        };

        if let Some(err) = &failure {
            error!(day = %job.day, shard = %shard.display(), inserted, error = %err, "day migration failed");
        } else {
            debug!(day = %job.day, shard = %shard.display(), inserted, "day migrated");
        }

        JobResult {
            day: job.day,
            shard,
            events,
            inserted,
            failure,
        }
    }
}
