//! `activemonitor rec`: record the current second.

use std::io::Write;
use std::path::PathBuf;

use activemonitor_core::day::format_timestamp;
use activemonitor_core::signal::SignalError;
use activemonitor_core::{ProcessSignal, RecordOutcome, Recorder, Settings, SuppressionSignal};
use clap::Args;
use serde::Serialize;

use crate::output::{OutputMode, fail, pretty_kv, render_mode};

/// Arguments for `activemonitor rec`.
#[derive(Args, Debug, Default)]
pub struct RecArgs {}

#[derive(Debug, Serialize)]
struct RecReport {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shard: Option<PathBuf>,
}

impl From<&RecordOutcome> for RecReport {
    fn from(outcome: &RecordOutcome) -> Self {
        let (at, shard) = match outcome {
            RecordOutcome::Recorded { at, shard } | RecordOutcome::AlreadyRecorded { at, shard } => {
                (Some(format_timestamp(*at)), Some(shard.clone()))
            }
            RecordOutcome::Suppressed => (None, None),
        };
        Self {
            outcome: outcome.label(),
            at,
            shard,
        }
    }
}

/// Execute `activemonitor rec`.
pub fn run_rec(_args: &RecArgs, settings: &Settings, output: OutputMode) -> anyhow::Result<()> {
    let process = settings.suppress_process.as_deref().map(ProcessSignal::new);
    let signal = move || -> Result<bool, SignalError> {
        process.as_ref().map_or(Ok(false), ProcessSignal::is_suppressed)
    };

    let recorder = Recorder::new(
        &settings.db_dir,
        settings.boundary,
        super::clock(settings),
        signal,
    );
    let outcome = recorder
        .record()
        .map_err(|e| fail(output, e.code(), &e))?;

    render_mode(
        output,
        &RecReport::from(&outcome),
        |report, w| match (&report.at, &report.shard) {
            (Some(at), Some(shard)) => {
                writeln!(w, "{} {at} {}", report.outcome, shard.display())
            }
            _ => writeln!(w, "{}", report.outcome),
        },
        |report, w| {
            pretty_kv(w, "outcome", report.outcome)?;
            if let Some(at) = &report.at {
                pretty_kv(w, "at", at)?;
            }
            if let Some(shard) = &report.shard {
                pretty_kv(w, "shard", shard.display().to_string())?;
            }
            Ok(())
        },
    )
}
