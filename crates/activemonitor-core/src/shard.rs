//! Day-sharded storage layout.
//!
//! Every activity day owns one SQLite file named after the day:
//!
//! ```text
//! ~/.activemonitor/
//!   20240301.db
//!   20240302.db
//!   20240304.db     # days without activity have no file
//! ```
//!
//! # Invariants
//!
//! - The file name is a pure function of the day and maps back to it.
//! - Shards are created lazily by the first write and never merged or split.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Extension of every shard file.
pub const SHARD_EXTENSION: &str = "db";

const SHARD_STEM_FORMAT: &str = "%Y%m%d";

/// Shard file name for `day`, e.g. `"20240301.db"`.
#[must_use]
pub fn shard_file_name(day: NaiveDate) -> String {
    format!("{}.{SHARD_EXTENSION}", day.format(SHARD_STEM_FORMAT))
}

/// Path of the shard holding `day` under `base_dir`.
#[must_use]
pub fn shard_path(base_dir: &Path, day: NaiveDate) -> PathBuf {
    base_dir.join(shard_file_name(day))
}

/// Parse a shard file name like `"20240301.db"` back into its day.
#[must_use]
pub fn parse_shard_file_name(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(SHARD_EXTENSION)?.strip_suffix('.')?;
    if stem.len() != 8 || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(stem, SHARD_STEM_FORMAT).ok()
}

/// List the days that have a shard under `base_dir`, oldest first.
///
/// Files that do not match the shard naming scheme are skipped. A missing
/// directory lists as empty.
///
/// # Errors
///
/// Returns an I/O error if the directory exists but cannot be read.
pub fn list_shard_days(base_dir: &Path) -> io::Result<Vec<NaiveDate>> {
    if !base_dir.exists() {
        return Ok(Vec::new());
    }

    let mut days = Vec::new();
    for entry in fs::read_dir(base_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(day) = parse_shard_file_name(&name.to_string_lossy()) {
            days.push(day);
        }
    }
    days.sort_unstable();
    Ok(days)
}
