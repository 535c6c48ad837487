#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::env;
use std::io;
use std::path::PathBuf;

use activemonitor_core::{Overrides, Settings};
use clap::{Parser, Subcommand};
use output::{OutputMode, fail};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "activemonitor: record activity into day shards and chart it",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding the day shards (overrides `DB_DIR`).
    #[arg(long, global = true, value_name = "DIR")]
    db_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags and the environment.
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.json)
    }

    /// Command-line values that take precedence over env and config file.
    fn overrides(&self) -> Overrides {
        let mut overrides = Overrides {
            db_dir: self.db_dir.clone(),
            ..Overrides::default()
        };
        match &self.command {
            Commands::Show(args) => overrides.interval_secs = args.interval,
            Commands::Migrate(args) => {
                overrides.legacy_db.clone_from(&args.source);
                overrides.max_workers = args.jobs;
            }
            Commands::Rec(_) | Commands::Days(_) => {}
        }
        overrides
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Record",
        about = "Record the current second",
        long_about = "Record the current second into the shard of the current activity day, \
                      unless the suppression process is running.",
        after_help = "EXAMPLES:\n    # Record now\n    activemonitor rec\n\n    # Record a pinned instant\n    NOW='2024-03-01 12:00:00' activemonitor rec"
    )]
    Rec(cmd::rec::RecArgs),

    #[command(
        next_help_heading = "Read",
        about = "Chart one activity day",
        long_about = "Print one row per bucket for an activity day, with one mark per event.",
        after_help = "EXAMPLES:\n    # Chart the current activity day\n    activemonitor show\n\n    # Chart a given day in 15-minute buckets\n    activemonitor show --date 2024-03-01 --interval 900\n\n    # Emit machine-readable output\n    activemonitor show --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Split the legacy store into day shards",
        long_about = "Read every event from the legacy single-file store and write each \
                      activity day into its own shard, a bounded number of days at a time.",
        after_help = "EXAMPLES:\n    # Migrate the default legacy store\n    activemonitor migrate\n\n    # Migrate a given file with 4 workers\n    activemonitor migrate --source ./old.db --jobs 4"
    )]
    Migrate(cmd::migrate::MigrateArgs),

    #[command(
        next_help_heading = "Read",
        about = "List day shards",
        long_about = "List every day shard in the shard directory with its event count.",
        after_help = "EXAMPLES:\n    # List shards\n    activemonitor days\n\n    # Emit machine-readable output\n    activemonitor days --json"
    )]
    Days(cmd::days::DaysArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("ACTIVEMONITOR_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "activemonitor=debug,activemonitor_core=debug,info"
        } else {
            "activemonitor=info,activemonitor_core=info,warn"
        })
    });

    let format = env::var("ACTIVEMONITOR_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    let settings =
        Settings::load(&cli.overrides()).map_err(|e| fail(output, e.code(), &e))?;
    debug!(
        db_dir = %settings.db_dir.display(),
        offset_hours = settings.boundary.offset_hours(),
        pinned_now = settings.now.is_some(),
        "settings resolved"
    );

    match cli.command {
        Commands::Rec(ref args) => cmd::rec::run_rec(args, &settings, output),
        Commands::Show(ref args) => cmd::show::run_show(args, &settings, output),
        Commands::Migrate(ref args) => cmd::migrate::run_migrate(args, &settings, output),
        Commands::Days(ref args) => cmd::days::run_days(args, &settings, output),
    }
}
