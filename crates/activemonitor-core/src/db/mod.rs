//! SQLite shard connection utilities.
//!
//! Each shard is a small standalone database file. Connections use:
//! - `busy_timeout = 5s` so a recorder racing a reader waits instead of failing
//! - `synchronous = NORMAL` since a lost trailing second is acceptable

pub mod schema;

use rusqlite::{Connection, OpenFlags};
use std::{path::Path, time::Duration};

/// Busy timeout used for shard connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) a shard database, apply runtime pragmas, and ensure the
/// schema exists. Parent directories must already exist.
///
/// # Errors
///
/// Returns the SQLite error if opening or configuring the database fails.
pub fn open_shard(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    configure_connection(&conn)?;
    schema::ensure_schema(&conn)?;
    Ok(conn)
}

/// Open an existing shard database read-only.
///
/// Never creates the file and never touches the schema: a database without
/// the events table is reported by the first query against it.
///
/// # Errors
///
/// Returns the SQLite error if the file is missing or cannot be opened.
pub fn open_shard_read_only(path: &Path) -> rusqlite::Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_BUSY_TIMEOUT, open_shard, open_shard_read_only};
    use tempfile::TempDir;

    fn temp_shard_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("20240301.db");
        (dir, path)
    }

    #[test]
    fn open_shard_sets_busy_timeout_and_synchronous() {
        let (_dir, path) = temp_shard_path();
        let conn = open_shard(&path).expect("open shard");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(
            u128::from(busy_timeout_ms),
            DEFAULT_BUSY_TIMEOUT.as_millis()
        );

        let synchronous: i64 = conn
            .pragma_query_value(None, "synchronous", |row| row.get(0))
            .expect("query synchronous");
        assert_eq!(synchronous, 1);
    }

    #[test]
    fn open_shard_creates_file_and_table() {
        let (_dir, path) = temp_shard_path();
        let conn = open_shard(&path).expect("open shard");
        assert!(path.exists());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM receive", [], |row| row.get(0))
            .expect("table exists");
        assert_eq!(count, 0);
    }

    #[test]
    fn read_only_refuses_missing_file() {
        let (_dir, path) = temp_shard_path();
        assert!(open_shard_read_only(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn read_only_reopens_created_shard() {
        let (_dir, path) = temp_shard_path();
        drop(open_shard(&path).expect("create"));
        let conn = open_shard_read_only(&path).expect("reopen");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM receive", [], |row| row.get(0))
            .expect("table exists");
        assert_eq!(count, 0);
    }

    #[test]
    fn read_only_leaves_foreign_database_alone() {
        let (_dir, path) = temp_shard_path();
        {
            let conn = rusqlite::Connection::open(&path).expect("create");
            conn.execute_batch("CREATE TABLE other (x INTEGER);")
                .expect("foreign schema");
        }

        let conn = open_shard_read_only(&path).expect("open");
        assert!(conn.query_row("SELECT COUNT(*) FROM receive", [], |row| row.get::<_, i64>(0)).is_err());
        assert!(conn.execute_batch("CREATE TABLE receive (time DATETIME);").is_err());
        drop(conn);

        let conn = rusqlite::Connection::open(&path).expect("reopen");
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'receive'",
                [],
                |row| row.get(0),
            )
            .expect("sqlite_master");
        assert_eq!(tables, 0);
    }
}
