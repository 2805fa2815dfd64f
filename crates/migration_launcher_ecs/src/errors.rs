use migration_launcher_core::config::{ConfigError, ValidationError};
use migration_launcher_core::lifecycle::LaunchFailure;
use migration_launcher_core::report::{EXIT_CANCELLED, EXIT_FAILURE};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    #[error("failed to start task: {}", format_failures(.0))]
    LaunchRejected(Vec<LaunchFailure>),

    #[error("cancelled before the migration task was launched")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

impl LauncherError {
    pub fn service(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            operation,
            message: message.into(),
        }
    }

    /// Process exit status when the launcher could not produce a report.
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Cancelled => EXIT_CANCELLED,
            _ => EXIT_FAILURE,
        }
    }
}

fn format_failures(failures: &[LaunchFailure]) -> String {
    if failures.is_empty() {
        return "scheduler returned no task".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, LauncherError>;
