//! Suppression signals: conditions under which activity must not be recorded.
//!
//! The production signal looks for a running process whose name contains a
//! configured fragment (the macOS screensaver by default; process names are
//! truncated to 16 bytes there, hence `ScreenSaverEngin`).

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

use crate::error::ErrorCode;

/// Default process-name fragment that suppresses recording.
pub const DEFAULT_SUPPRESS_PROCESS: &str = "ScreenSaverEngin";

/// The suppression condition could not be evaluated.
#[derive(Debug, thiserror::Error)]
#[error("suppression signal unavailable: {reason}")]
pub struct SignalError {
    reason: String,
}

impl SignalError {
    /// Create an error with a human-readable reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::SignalUnavailable
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// Decides, at call time, whether recording is suppressed.
pub trait SuppressionSignal {
    /// `Ok(true)` when recording must be skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError`] when the condition cannot be evaluated.
    fn is_suppressed(&self) -> Result<bool, SignalError>;
}

impl<F> SuppressionSignal for F
where
    F: Fn() -> Result<bool, SignalError>,
{
    fn is_suppressed(&self) -> Result<bool, SignalError> {
        self()
    }
}

/// A signal that never suppresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSuppressed;

impl SuppressionSignal for NeverSuppressed {
    fn is_suppressed(&self) -> Result<bool, SignalError> {
        Ok(false)
    }
}

/// Suppresses while any process name contains `fragment`.
#[derive(Debug, Clone)]
pub struct ProcessSignal {
    fragment: String,
}

impl ProcessSignal {
    /// Watch for processes whose name contains `fragment`.
    #[must_use]
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
        }
    }

    /// The name fragment being matched.
    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

impl Default for ProcessSignal {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESS_PROCESS)
    }
}

impl SuppressionSignal for ProcessSignal {
    fn is_suppressed(&self) -> Result<bool, SignalError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(SignalError::new(
                "process listing is not supported on this platform",
            ));
        }

        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );
        if system.processes().is_empty() {
            return Err(SignalError::new("process list is empty"));
        }

        let found = system
            .processes()
            .values()
            .find(|process| process.name().to_string_lossy().contains(&self.fragment));

        if let Some(process) = found {
            debug!(
                pid = %process.pid(),
                fragment = %self.fragment,
                "suppressing process is running"
            );
            return Ok(true);
        }
        Ok(false)
    }
}
