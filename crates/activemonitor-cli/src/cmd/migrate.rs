//! `activemonitor migrate`: split the legacy single-file store into day shards.

use std::io::Write;
use std::path::PathBuf;

use activemonitor_core::migrate::MigrationReport;
use activemonitor_core::{MigrateError, Migrator, Settings};
use clap::Args;

use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render_mode};

/// Arguments for `activemonitor migrate`.
#[derive(Args, Debug, Default)]
pub struct MigrateArgs {
    /// Legacy store to read (defaults to `DB_PATH` or `~/.activemonitor.db`).
    #[arg(long, value_name = "PATH")]
    pub source: Option<PathBuf>,

    /// Maximum number of days migrated concurrently.
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,
}

/// Execute `activemonitor migrate`.
///
/// When some days fail, the report for every day is still printed before
/// the command exits non-zero.
pub fn run_migrate(
    _args: &MigrateArgs,
    settings: &Settings,
    output: OutputMode,
) -> anyhow::Result<()> {
    let migrator =
        Migrator::new(&settings.db_dir, settings.boundary).with_max_workers(settings.max_workers);

    match migrator.migrate(&settings.legacy_db) {
        Ok(report) => print_report(output, &report),
        Err(err) => {
            if let Some(report) = err.report() {
                print_report(output, report)?;
            }
            Err(fail(output, err.code(), describe(&err)))
        }
    }
}

fn describe(err: &MigrateError) -> String {
    match err {
        MigrateError::GroupsFailed {
            failed,
            total,
            first,
            ..
        } => format!("{failed} of {total} days failed; first: {first}"),
        other => other.to_string(),
    }
}

fn print_report(output: OutputMode, report: &MigrationReport) -> anyhow::Result<()> {
    render_mode(
        output,
        report,
        |r, w| {
            for day in &r.days {
                let status = day.error.as_deref().unwrap_or("ok");
                writeln!(w, "{}\t{}/{}\t{status}", day.day, day.inserted, day.events)?;
            }
            writeln!(
                w,
                "migrated {} of {} events across {} days",
                r.events_migrated,
                r.events_seen,
                r.days.len()
            )
        },
        |r, w| {
            pretty_section(w, &format!("Migration from {}", r.source.display()))?;
            for day in &r.days {
                let status = day.error.as_deref().unwrap_or("ok");
                writeln!(
                    w,
                    "{:<12} {:>6}/{:<6} {status}",
                    day.day.to_string(),
                    day.inserted,
                    day.events
                )?;
            }
            writeln!(w)?;
            pretty_kv(w, "events", format!("{}/{}", r.events_migrated, r.events_seen))?;
            pretty_kv(w, "days", r.days.len().to_string())?;
            pretty_kv(w, "failed", r.failed_days().to_string())?;
            pretty_kv(w, "peak jobs", r.peak_concurrency.to_string())
        },
    )
}
