//! activemonitor-core library.
//!
//! Activity is recorded as second-precision timestamps, one SQLite shard per
//! activity day, and read back as fixed-width histograms.
//!
//! # Conventions
//!
//! - **Errors**: one `thiserror` enum per component, each mapping to an
//!   [`ErrorCode`] via `code()`.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `error!`, `debug!`).
//! - **Time**: naive local wall-clock values; "now" is injected through
//!   [`Clock`].

pub mod clock;
pub mod config;
pub mod day;
pub mod db;
pub mod error;
pub mod histogram;
pub mod migrate;
pub mod recorder;
pub mod shard;
pub mod signal;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, Overrides, Settings};
pub use day::DayBoundary;
pub use error::ErrorCode;
pub use histogram::{Histogram, HistogramError, histogram};
pub use migrate::{MigrateError, MigrationReport, Migrator};
pub use recorder::{RecordError, RecordOutcome, Recorder};
pub use signal::{NeverSuppressed, ProcessSignal, SignalError, SuppressionSignal};
pub use store::{EventStore, StoreError};
