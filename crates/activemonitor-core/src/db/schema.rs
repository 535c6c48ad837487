//! Shard schema: a single append-only table of second-precision timestamps.
//!
//! The column is its own primary key, so a shard can hold each second at most
//! once, and the `CHECK` pins the literal to `YYYY-MM-DD HH:MM:SS`.

use rusqlite::Connection;

/// Table holding one row per recorded instant.
pub const EVENTS_TABLE: &str = "receive";

/// Idempotent schema creation, safe to run on every open.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS receive (
    time DATETIME CHECK (time LIKE '____-__-__ __:__:__') PRIMARY KEY
);
";

/// Create the event table if it does not exist yet.
///
/// # Errors
///
/// Returns the underlying SQLite error if the statement fails.
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
