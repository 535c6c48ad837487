//! Runtime settings.
//!
//! Resolved once at startup with precedence command-line flags > environment
//! > `<config_dir>/activemonitor/config.toml` > built-in defaults. Empty
//! environment values count as unset, except `ACTIVEMONITOR_SUPPRESS`, where
//! an empty value turns suppression off.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::day::{DEFAULT_DAY_OFFSET_HOURS, DayBoundary, parse_timestamp};
use crate::error::ErrorCode;
use crate::histogram::DEFAULT_INTERVAL_SECS;
use crate::migrate::DEFAULT_MAX_WORKERS;
use crate::signal::DEFAULT_SUPPRESS_PROCESS;

pub const ENV_DB_DIR: &str = "DB_DIR";
pub const ENV_DB_PATH: &str = "DB_PATH";
pub const ENV_NOW: &str = "NOW";
pub const ENV_INTERVAL: &str = "ACTIVEMONITOR_INTERVAL";
pub const ENV_DAY_OFFSET: &str = "ACTIVEMONITOR_DAY_OFFSET";
pub const ENV_SUPPRESS: &str = "ACTIVEMONITOR_SUPPRESS";

/// Configuration failures. All of them are [`ErrorCode::InvalidInput`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {key} {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("cannot determine the home directory; set {ENV_DB_DIR} and {ENV_DB_PATH}")]
    NoHome,
}

impl ConfigError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidInput
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    fn invalid(key: &'static str, value: impl Into<String>, reason: &'static str) -> Self {
        Self::Invalid {
            key,
            value: value.into(),
            reason,
        }
    }
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub db_dir: Option<PathBuf>,
    #[serde(default)]
    pub legacy_db: Option<PathBuf>,
    #[serde(default)]
    pub interval_secs: Option<u32>,
    #[serde(default)]
    pub day_offset_hours: Option<i64>,
    #[serde(default)]
    pub suppress_process: Option<String>,
    #[serde(default)]
    pub max_workers: Option<usize>,
}

impl FileConfig {
    /// Parse a TOML document; `path` is only used for error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML or unknown keys.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the file at `path`; a missing file yields the empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }
}

/// Location of the user config file, if the platform has a config directory.
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("activemonitor").join("config.toml"))
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub db_dir: Option<PathBuf>,
    pub legacy_db: Option<PathBuf>,
    pub interval_secs: Option<u32>,
    pub max_workers: Option<usize>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_dir: PathBuf,
    pub legacy_db: PathBuf,
    pub interval_secs: u32,
    /// Pinned "now" from `NOW`; `None` means the system clock.
    pub now: Option<NaiveDateTime>,
    pub boundary: DayBoundary,
    /// Process-name fragment that suppresses recording; `None` disables it.
    pub suppress_process: Option<String>,
    pub max_workers: usize,
}

impl Settings {
    /// Resolve from the process environment and the user config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable or any value is
    /// invalid.
    pub fn load(overrides: &Overrides) -> Result<Self, ConfigError> {
        let file = match config_file_path() {
            Some(path) => FileConfig::load(&path)?,
            None => FileConfig::default(),
        };
        let home = dirs::home_dir();
        Self::resolve(overrides, &file, |key| env::var(key).ok(), home.as_deref())
    }

    /// Resolve from explicit sources. `env` looks up one variable by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for out-of-range or unparsable
    /// values, or [`ConfigError::NoHome`] when a default path is needed but
    /// `home` is `None`.
    pub fn resolve<E>(
        overrides: &Overrides,
        file: &FileConfig,
        env: E,
        home: Option<&Path>,
    ) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let db_dir = overrides
            .db_dir
            .clone()
            .or_else(|| non_empty(ENV_DB_DIR).map(PathBuf::from))
            .or_else(|| file.db_dir.clone())
            .map_or_else(|| default_path(home, ".activemonitor"), Ok)?;

        let legacy_db = overrides
            .legacy_db
            .clone()
            .or_else(|| non_empty(ENV_DB_PATH).map(PathBuf::from))
            .or_else(|| file.legacy_db.clone())
            .map_or_else(|| default_path(home, ".activemonitor.db"), Ok)?;

        let interval_secs = match (overrides.interval_secs, non_empty(ENV_INTERVAL)) {
            (Some(v), _) => v,
            (None, Some(raw)) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_INTERVAL, raw, "not a number of seconds"))?,
            (None, None) => file.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS),
        };
        if interval_secs == 0 {
            return Err(ConfigError::invalid(
                "interval",
                "0",
                "must be a positive number of seconds",
            ));
        }

        let now = non_empty(ENV_NOW)
            .map(|raw| {
                parse_timestamp(raw.trim())
                    .map_err(|_| ConfigError::invalid(ENV_NOW, raw, "expected YYYY-MM-DD HH:MM:SS"))
            })
            .transpose()?;

        let offset_hours = match non_empty(ENV_DAY_OFFSET) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_DAY_OFFSET, raw, "not a whole number of hours"))?,
            None => file.day_offset_hours.unwrap_or(DEFAULT_DAY_OFFSET_HOURS),
        };
        let boundary = DayBoundary::new(offset_hours).ok_or_else(|| {
            ConfigError::invalid(
                "day offset",
                offset_hours.to_string(),
                "must be between -23 and 23 hours",
            )
        })?;

        let suppress_process = env(ENV_SUPPRESS)
            .or_else(|| file.suppress_process.clone())
            .unwrap_or_else(|| DEFAULT_SUPPRESS_PROCESS.to_string());
        let suppress_process = Some(suppress_process).filter(|s| !s.is_empty());

        let max_workers = overrides
            .max_workers
            .or(file.max_workers)
            .unwrap_or(DEFAULT_MAX_WORKERS);
        if max_workers == 0 {
            return Err(ConfigError::invalid("max workers", "0", "must be at least 1"));
        }

        Ok(Self {
            db_dir,
            legacy_db,
            interval_secs,
            now,
            boundary,
            suppress_process,
            max_workers,
        })
    }
}

fn default_path(home: Option<&Path>, name: &str) -> Result<PathBuf, ConfigError> {
    home.map(|h| h.join(name)).ok_or(ConfigError::NoHome)
}
