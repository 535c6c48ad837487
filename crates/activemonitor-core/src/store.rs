//! Per-shard event store.
//!
//! An [`EventStore`] owns one connection to one shard file. It records
//! second-precision timestamps and scans them back, either by range (read
//! path) or wholesale together with their destination day (legacy migration).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rusqlite::{Connection, Statement, ffi, params};
use tracing::debug;

use crate::day::{DayBoundary, format_timestamp, parse_timestamp, truncate_to_second};
use crate::db;
use crate::error::ErrorCode;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by shard operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A read path asked for a shard that was never created.
    #[error("shard {} does not exist", .path.display())]
    ShardMissing { path: PathBuf },

    /// The shard directory could not be created.
    #[error("cannot create shard directory {}: {source}", .path.display())]
    ShardDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The shard file could not be opened or initialized.
    #[error("cannot open shard {}: {source}", .path.display())]
    ShardUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The timestamp is already stored in this shard.
    #[error("{timestamp} already recorded in {}", .path.display())]
    DuplicateKey { timestamp: String, path: PathBuf },

    /// The literal does not have the `YYYY-MM-DD HH:MM:SS` shape.
    #[error("malformed timestamp {literal:?} for {}", .path.display())]
    MalformedTimestamp { literal: String, path: PathBuf },

    /// A stored row could not be read back as a timestamp.
    #[error("corrupt timestamp {raw:?} in {}", .path.display())]
    CorruptTimestamp { raw: String, path: PathBuf },

    /// Any other storage engine failure.
    #[error("sqlite error on {}: {source}", .path.display())]
    Sqlite {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

impl StoreError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ShardMissing { .. }
            | Self::ShardDirectory { .. }
            | Self::ShardUnavailable { .. } => ErrorCode::ShardUnavailable,
            Self::DuplicateKey { .. } => ErrorCode::DuplicateKey,
            Self::MalformedTimestamp { .. } => ErrorCode::InvalidInput,
            Self::CorruptTimestamp { .. } | Self::Sqlite { .. } => ErrorCode::InternalUnexpected,
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Returns `true` for a timestamp collision.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    fn sqlite(path: &Path, source: rusqlite::Error) -> Self {
        Self::Sqlite {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Extended result code of a failed insert, if it was a constraint violation.
fn constraint_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Legacy rows
// ---------------------------------------------------------------------------

/// A stored event paired with the activity day it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayKeyedEvent {
    /// Epoch seconds of the destination day's midnight (see
    /// [`crate::day::day_epoch`]).
    pub day_key: i64,
    /// Timestamp in the on-disk literal format.
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// EventStore
// ---------------------------------------------------------------------------

/// One open shard.
pub struct EventStore {
    conn: Connection,
    path: PathBuf,
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore").field("path", &self.path).finish()
    }
}

impl EventStore {
    /// Open the shard at `path`, creating it (and its parent directory) on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShardDirectory`] or
    /// [`StoreError::ShardUnavailable`] when the shard cannot be created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::ShardDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = db::open_shard(path).map_err(|source| StoreError::ShardUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(shard = %path.display(), "opened shard");

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open a shard that must already exist, read-only.
    ///
    /// Only scans and counts are possible on the result. The file is not
    /// modified, not even to add a missing events table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShardMissing`] if there is no file at `path`, or
    /// [`StoreError::ShardUnavailable`] if it cannot be opened.
    pub fn open_existing(path: &Path) -> Result<Self, StoreError> {
        if !path.is_file() {
            return Err(StoreError::ShardMissing {
                path: path.to_path_buf(),
            });
        }

        let conn =
            db::open_shard_read_only(path).map_err(|source| StoreError::ShardUnavailable {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(shard = %path.display(), "opened existing shard");

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path of the underlying shard file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the event table if absent. Already done by the constructors;
    /// calling it again is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the schema statement fails.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        db::schema::ensure_schema(&self.conn).map_err(|e| StoreError::sqlite(&self.path, e))
    }

    /// Record one event at `ts`, truncated to the second.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`] if that second is already stored.
    pub fn record_event(&self, ts: NaiveDateTime) -> Result<(), StoreError> {
        self.record_raw(&format_timestamp(truncate_to_second(ts)))
    }

    /// Record an already formatted `YYYY-MM-DD HH:MM:SS` literal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`] on collision and
    /// [`StoreError::MalformedTimestamp`] if the literal has the wrong shape.
    pub fn record_raw(&self, literal: &str) -> Result<(), StoreError> {
        self.conn
            .execute("INSERT INTO receive (time) VALUES (?1)", [literal])
            .map_err(|err| match constraint_code(&err) {
                Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                    StoreError::DuplicateKey {
                        timestamp: literal.to_string(),
                        path: self.path.clone(),
                    }
                }
                Some(ffi::SQLITE_CONSTRAINT_CHECK) => StoreError::MalformedTimestamp {
                    literal: literal.to_string(),
                    path: self.path.clone(),
                },
                _ => StoreError::sqlite(&self.path, err),
            })?;
        Ok(())
    }

    /// Prepare a scan over events in the closed range `[start, end]`.
    ///
    /// The returned [`EventScan`] is lazy: nothing is read until
    /// [`EventScan::iter`] is called, and each call restarts from the
    /// beginning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query cannot be prepared.
    pub fn scan_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<EventScan<'_>, StoreError> {
        let stmt = self
            .conn
            .prepare("SELECT time FROM receive WHERE time BETWEEN ?1 AND ?2 ORDER BY time ASC")
            .map_err(|e| StoreError::sqlite(&self.path, e))?;

        Ok(EventScan {
            stmt,
            start: format_timestamp(start),
            end: format_timestamp(end),
            path: &self.path,
        })
    }

    /// Read every stored event together with its destination day key.
    ///
    /// The key is computed by SQLite in the same pass using
    /// [`DayBoundary::sqlite_modifier`], and equals
    /// [`DayBoundary::day_key`] of the timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptTimestamp`] for rows SQLite cannot read as
    /// a date, or [`StoreError::Sqlite`] on query failure.
    pub fn scan_all(&self, boundary: DayBoundary) -> Result<Vec<DayKeyedEvent>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT
                    CAST(strftime('%s', date(time, ?1)) AS INTEGER),
                    strftime('%Y-%m-%d %H:%M:%S', time),
                    CAST(time AS TEXT)
                FROM receive
                ORDER BY time ASC",
            )
            .map_err(|e| StoreError::sqlite(&self.path, e))?;

        let rows = stmt
            .query_map([boundary.sqlite_modifier()], |row| {
                Ok((
                    row.get::<_, Option<i64>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .map_err(|e| StoreError::sqlite(&self.path, e))?;

        let mut events = Vec::new();
        for row in rows {
            let (day_key, timestamp, raw) = row.map_err(|e| StoreError::sqlite(&self.path, e))?;
            match (day_key, timestamp) {
                (Some(day_key), Some(timestamp)) => events.push(DayKeyedEvent { day_key, timestamp }),
                _ => {
                    return Err(StoreError::CorruptTimestamp {
                        raw: raw.unwrap_or_default(),
                        path: self.path.clone(),
                    });
                }
            }
        }
        Ok(events)
    }

    /// Number of events stored in this shard.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] on query failure.
    pub fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM receive", [], |row| row.get(0))
            .map_err(|e| StoreError::sqlite(&self.path, e))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// EventScan
// ---------------------------------------------------------------------------

/// A prepared, restartable range scan over one shard.
pub struct EventScan<'conn> {
    stmt: Statement<'conn>,
    start: String,
    end: String,
    path: &'conn Path,
}

impl EventScan<'_> {
    /// Iterate matching timestamps in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query cannot be started. Row-level
    /// failures surface as `Err` items.
    pub fn iter(
        &mut self,
    ) -> Result<impl Iterator<Item = Result<NaiveDateTime, StoreError>> + '_, StoreError> {
        let path = self.path;
        let rows = self
            .stmt
            .query_map(params![self.start, self.end], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::sqlite(path, e))?;

        Ok(rows.map(move |raw| {
            let raw = raw.map_err(|e| StoreError::sqlite(path, e))?;
            parse_timestamp(&raw).map_err(|_| StoreError::CorruptTimestamp {
                raw,
                path: path.to_path_buf(),
            })
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
