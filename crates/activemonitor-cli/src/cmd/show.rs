//! `activemonitor show`: chart one activity day.

use std::io::Write;

use activemonitor_core::day::{format_timestamp, parse_date};
use activemonitor_core::shard::shard_path;
use activemonitor_core::{Clock, ErrorCode, EventStore, Settings, histogram};
use clap::Args;
use tracing::debug;

use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render_mode};

/// Arguments for `activemonitor show`.
#[derive(Args, Debug, Default)]
pub struct ShowArgs {
    /// Activity day to chart (YYYY-MM-DD). Defaults to the current activity day.
    #[arg(long)]
    pub date: Option<String>,

    /// Bucket width in seconds.
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u32>,
}

/// Execute `activemonitor show`.
pub fn run_show(args: &ShowArgs, settings: &Settings, output: OutputMode) -> anyhow::Result<()> {
    let day = match args.date.as_deref() {
        Some(raw) => parse_date(raw).map_err(|_| {
            fail(
                output,
                ErrorCode::InvalidInput,
                format!("invalid date {raw:?}, expected YYYY-MM-DD"),
            )
        })?,
        None => settings.boundary.day_of(super::clock(settings).now()),
    };

    let shard = shard_path(&settings.db_dir, day);
    debug!(%day, shard = %shard.display(), interval = settings.interval_secs, "charting day");

    let store = EventStore::open_existing(&shard).map_err(|e| fail(output, e.code(), &e))?;
    let chart = histogram(&store, settings.boundary, day, settings.interval_secs)
        .map_err(|e| fail(output, e.code(), &e))?;

    render_mode(
        output,
        &chart,
        |h, w| h.render(w),
        |h, w| {
            pretty_section(w, &format!("Activity for {}", h.day))?;
            pretty_kv(
                w,
                "window",
                format!(
                    "{} .. {}",
                    format_timestamp(h.window_start),
                    format_timestamp(h.window_end)
                ),
            )?;
            pretty_kv(w, "interval", format!("{}s", h.interval_secs))?;
            pretty_kv(w, "events", h.total().to_string())?;
            writeln!(w)?;
            h.render(w)
        },
    )
}
