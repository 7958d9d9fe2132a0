//! CLI-specific error types and exit code mapping

use logfunnel_core::error::LogfunnelError;
use logfunnel_sink::SinkError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Sink could not be used after it was created.
    #[error("sink error: {0}")]
    Sink(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (input read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from logfunnel-core.
    #[error("{0}")]
    Core(#[from] LogfunnelError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                 |
    /// |------|-------------------------|
    /// | 0    | Success                 |
    /// | 1    | General / command error |
    /// | 2    | Configuration error     |
    /// | 10   | IO error                |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(LogfunnelError::Config(_)) => 2,
            Self::Io(_) | Self::Core(LogfunnelError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Sink(_) | Self::Core(_) => 1,
        }
    }
}

impl From<SinkError> for CliError {
    fn from(e: SinkError) -> Self {
        match e {
            SinkError::Config { .. } | SinkError::DestinationNotReady { .. } => {
                Self::Config(e.to_string())
            }
            other => Self::Sink(other.to_string()),
        }
    }
}
