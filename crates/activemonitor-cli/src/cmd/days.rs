//! `activemonitor days`: list day shards with their event counts.

use std::io::Write;
use std::path::PathBuf;

use activemonitor_core::shard::{list_shard_days, shard_path};
use activemonitor_core::{ErrorCode, EventStore, Settings};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use tracing::warn;

use crate::output::{OutputMode, fail, pretty_rule, render_mode};

/// Arguments for `activemonitor days`.
#[derive(Args, Debug, Default)]
pub struct DaysArgs {}

#[derive(Debug, Serialize)]
struct DayEntry {
    day: NaiveDate,
    shard: PathBuf,
    /// `None` when the shard could not be opened or counted.
    events: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DayEntry {
    fn events_cell(&self) -> String {
        self.events.map_or_else(|| "unreadable".to_string(), |n| n.to_string())
    }
}

/// Execute `activemonitor days`.
pub fn run_days(_args: &DaysArgs, settings: &Settings, output: OutputMode) -> anyhow::Result<()> {
    let days = list_shard_days(&settings.db_dir).map_err(|e| {
        fail(
            output,
            ErrorCode::ShardUnavailable,
            format!("cannot list {}: {e}", settings.db_dir.display()),
        )
    })?;

    let mut entries = Vec::with_capacity(days.len());
    for day in days {
        let shard = shard_path(&settings.db_dir, day);
        let entry = match EventStore::open_existing(&shard).and_then(|store| store.count()) {
            Ok(events) => DayEntry { day, shard, events: Some(events), error: None },
            Err(e) => {
                warn!(shard = %shard.display(), code = e.code().code(), error = %e, "shard unreadable");
                DayEntry { day, shard, events: None, error: Some(e.to_string()) }
            }
        };
        entries.push(entry);
    }

    render_mode(
        output,
        &entries,
        |entries, w| {
            for e in entries {
                writeln!(w, "{}\t{}", e.day, e.events_cell())?;
            }
            Ok(())
        },
        |entries, w| {
            writeln!(w, "{:<12} {:>8}  SHARD", "DAY", "EVENTS")?;
            pretty_rule(w)?;
            for e in entries {
                writeln!(w, "{:<12} {:>8}  {}", e.day.to_string(), e.events_cell(), e.shard.display())?;
            }
            if entries.is_empty() {
                writeln!(w, "(no shards in {})", settings.db_dir.display())?;
            }
            Ok(())
        },
    )
}
