//! CLI-specific error types and exit code mapping

use playerwatch_core::error::PlayerwatchError;
use playerwatch_tracker::TrackerError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Game profile could not be resolved or compiled.
    #[error("profile error: {0}")]
    Profile(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from playerwatch-core.
    #[error("{0}")]
    Core(#[from] PlayerwatchError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                      |
    /// |------|------------------------------|
    /// | 0    | Success                      |
    /// | 1    | General / command error      |
    /// | 2    | Configuration error          |
    /// | 3    | Profile error                |
    /// | 10   | IO error                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(PlayerwatchError::Config(_)) => 2,
            Self::Profile(_) => 3,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<TrackerError> for CliError {
    fn from(e: TrackerError) -> Self {
        match e {
            TrackerError::Config { .. } => Self::Config(e.to_string()),
            other => Self::Profile(other.to_string()),
        }
    }
}
