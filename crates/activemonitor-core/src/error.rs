use std::fmt;

/// Machine-readable error codes shared by every activemonitor component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ShardUnavailable,
    DuplicateKey,
    SignalUnavailable,
    InvalidInput,
    MigrationFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ShardUnavailable => "E1001",
            Self::DuplicateKey => "E1002",
            Self::SignalUnavailable => "E2001",
            Self::InvalidInput => "E3001",
            Self::MigrationFailed => "E4001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ShardUnavailable => "Shard unavailable",
            Self::DuplicateKey => "Timestamp already recorded",
            Self::SignalUnavailable => "Suppression signal unavailable",
            Self::InvalidInput => "Invalid input",
            Self::MigrationFailed => "Migration failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ShardUnavailable => {
                Some("Check that the shard directory exists and is writable (DB_DIR).")
            }
            Self::DuplicateKey => None,
            Self::SignalUnavailable => {
                Some("Set ACTIVEMONITOR_SUPPRESS to an empty value to skip the process check.")
            }
            Self::InvalidInput => {
                Some("Dates use YYYY-MM-DD, NOW uses YYYY-MM-DD HH:MM:SS, intervals are > 0.")
            }
            Self::MigrationFailed => Some(
                "Inspect the failed days; destination shards may already hold those timestamps.",
            ),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
