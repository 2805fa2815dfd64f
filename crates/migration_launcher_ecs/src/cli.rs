use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use migration_launcher_core::report::ExitPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "run_migrations",
    about = "Run a one-shot database migration task on ECS",
    long_about = "Resolves database and network parameters from CloudFormation stack outputs,\n\
                  registers a migration task definition, runs it once on ECS and waits\n\
                  for it to stop within the configured poll budget."
)]
pub struct Cli {
    /// Launcher configuration file (TOML)
    #[arg(long, short, env = "MIGRATION_LAUNCHER_CONFIG", default_value = "migration.toml")]
    pub config: PathBuf,

    /// AWS region, overriding `aws.region` in the config file
    #[arg(long)]
    pub region: Option<String>,

    /// AWS shared-config profile, overriding `aws.profile` in the config file
    #[arg(long)]
    pub profile: Option<String>,

    /// Exit non-zero when the migration fails or is still running at the deadline
    #[arg(long)]
    pub strict: bool,

    /// Resolve infrastructure, print the redacted task definition and exit
    #[arg(long)]
    pub print_task_definition: bool,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    pub report_json: bool,

    /// Log level (defaults to MIGRATION_LAUNCHER_LOG, then info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn exit_policy(&self) -> ExitPolicy {
        if self.strict {
            ExitPolicy::Strict
        } else {
            ExitPolicy::Observational
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "run_migrations",
            "--config",
            "deploy/production.toml",
            "--region",
            "eu-west-1",
            "--strict",
            "--report-json",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ])
        .expect("cli should parse");

        assert_eq!(cli.config, PathBuf::from("deploy/production.toml"));
        assert_eq!(cli.region.as_deref(), Some("eu-west-1"));
        assert_eq!(cli.exit_policy(), ExitPolicy::Strict);
        assert!(cli.report_json);
        assert!(!cli.print_task_definition);
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn defaults_to_observational_text_output() {
        let cli = Cli::try_parse_from(["run_migrations", "-c", "migration.toml"])
            .expect("cli should parse");

        assert_eq!(cli.exit_policy(), ExitPolicy::Observational);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert_eq!(cli.log_level, None);
        assert_eq!(cli.profile, None);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let result = Cli::try_parse_from(["run_migrations", "--log-level", "verbose"]);
        assert!(result.is_err());
    }
}
