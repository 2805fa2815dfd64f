use std::process::ExitCode;

use clap::Parser;
use migration_launcher_core::config::{load_config, resolve_password, LauncherConfig};
use migration_launcher_core::report::{
    MigrationReport, WaitOutcome, EXIT_CANCELLED, EXIT_FAILURE, EXIT_OK,
};
use migration_launcher_ecs::adapters::pause::TokioPause;
use migration_launcher_ecs::aws::cloudformation::CloudFormationStackDescriber;
use migration_launcher_ecs::aws::ecs::EcsTaskScheduler;
use migration_launcher_ecs::cli::Cli;
use migration_launcher_ecs::errors::LauncherError;
use migration_launcher_ecs::handlers::launcher::{prepare_task_specification, run_migration};
use migration_launcher_ecs::interrupt::forward_interrupts;
use migration_launcher_ecs::logging::init_logging;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const BANNER_WIDTH: usize = 50;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(message) = init_logging(cli.log_level, cli.log_format) {
        eprintln!("{message}");
        return ExitCode::from(EXIT_FAILURE);
    }

    match run(&cli).await {
        Ok(status) => ExitCode::from(status),
        Err(error) => {
            error!(%error, "migration launcher failed");
            ExitCode::from(error.exit_status())
        }
    }
}

async fn run(cli: &Cli) -> Result<u8, LauncherError> {
    let config = load_config(&cli.config)?;
    let password = resolve_password(&config.database, |name| std::env::var(name).ok())?;
    let aws_config = load_aws_config(cli, &config).await;
    let describer =
        CloudFormationStackDescriber::new(aws_sdk_cloudformation::Client::new(&aws_config));

    if cli.print_task_definition {
        let (_, spec) = prepare_task_specification(&describer, &config, &password)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&spec.redacted())
                .expect("task specification should serialize")
        );
        return Ok(EXIT_OK);
    }

    let scheduler = EcsTaskScheduler::new(aws_sdk_ecs::Client::new(&aws_config));
    let cancel = CancellationToken::new();
    spawn_interrupt_listener(cancel.clone());

    print_banner("Running Database Migrations");
    let report = run_migration(
        &describer,
        &scheduler,
        &TokioPause,
        &config,
        &password,
        &cancel,
    )?;
    print_report(&report, &config, cli.report_json);

    Ok(report.exit_status(cli.exit_policy()))
}

async fn load_aws_config(cli: &Cli, config: &LauncherConfig) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = cli.region.clone().or_else(|| config.aws.region.clone()) {
        loader = loader.region(aws_config::Region::new(region));
    }
    if let Some(profile) = cli.profile.as_deref().or(config.aws.profile.as_deref()) {
        loader = loader.profile_name(profile);
    }
    loader.load().await
}

fn spawn_interrupt_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if forward_interrupts(tokio::signal::ctrl_c, cancel).await {
            std::process::exit(i32::from(EXIT_CANCELLED));
        }
    });
}

fn print_banner(title: &str) {
    let rule = "=".repeat(BANNER_WIDTH);
    println!("\n{rule}\n{title}\n{rule}\n");
}

fn print_report(report: &MigrationReport, config: &LauncherConfig, as_json: bool) {
    let log_group = &config.task.logs.group;
    match &report.outcome {
        WaitOutcome::Stopped { exit_code: 0, .. } => {
            info!(task_arn = %report.task.task_arn, "migrations completed successfully");
        }
        WaitOutcome::Stopped {
            exit_code,
            stopped_reason,
        } => {
            error!(
                task_arn = %report.task.task_arn,
                exit_code,
                stopped_reason = stopped_reason.as_deref().unwrap_or("unknown"),
                "migrations failed; check CloudWatch logs in {log_group}"
            );
        }
        WaitOutcome::StillRunning { stop_requested, .. } => {
            warn!(
                task_arn = %report.task.task_arn,
                stop_requested,
                "task still running after {} polls",
                report.polls
            );
        }
        WaitOutcome::Cancelled { stop_requested, .. } => {
            warn!(task_arn = %report.task.task_arn, stop_requested, "wait cancelled");
        }
    }

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).expect("migration report should serialize")
        );
        return;
    }

    println!("\n{}", report.summary(log_group));
    print_banner("Migration task completed!");
}
