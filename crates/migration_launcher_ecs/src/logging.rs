//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Filter priority: `--log-level`, then the `MIGRATION_LAUNCHER_LOG`
//! directives (same syntax as `RUST_LOG`), then `info`.
//! Logs go to stderr so stdout only carries the final report.

use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::{LogFormat, LogLevel};

pub const LOG_ENV: &str = "MIGRATION_LAUNCHER_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Installs the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, format: LogFormat) -> Result<(), String> {
    let env_value = std::env::var(LOG_ENV).ok();
    let builder = fmt()
        .with_env_filter(log_filter(cli_level, env_value.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|error| format!("failed to initialise logging: {error}"))
}

/// Unparseable or blank directives fall back to `info`.
pub fn log_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.as_str());
    }
    env_value
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}
