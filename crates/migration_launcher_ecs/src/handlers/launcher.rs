use std::collections::BTreeMap;

use migration_launcher_core::config::{
    ClusterConfig, InfrastructureConfig, LauncherConfig, OutputRef, PollingConfig,
};
use migration_launcher_core::lifecycle::{LaunchRequest, LaunchedTask, TaskStatus};
use migration_launcher_core::polling::PollPolicy;
use migration_launcher_core::report::{MigrationReport, WaitOutcome};
use migration_launcher_core::stack::{find_output, ResolvedInfrastructure};
use migration_launcher_core::task_spec::{build_task_specification, TaskSpecification};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::adapters::pause::Pause;
use crate::adapters::scheduler::TaskScheduler;
use crate::adapters::stack_describer::StackDescriber;
use crate::errors::{LauncherError, Result};

pub const CANCEL_STOP_REASON: &str = "Migration launcher cancelled by operator";
pub const TIMEOUT_STOP_REASON: &str = "Migration launcher poll budget exhausted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaitOptions {
    pub stop_on_timeout: bool,
    pub stop_on_cancel: bool,
}

impl From<&PollingConfig> for WaitOptions {
    fn from(config: &PollingConfig) -> Self {
        Self {
            stop_on_timeout: config.stop_on_timeout,
            stop_on_cancel: config.stop_on_cancel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    pub outcome: WaitOutcome,
    pub polls: u32,
}

pub fn resolve_endpoint(
    describer: &impl StackDescriber,
    stack_name: &str,
    output_key: &str,
) -> Result<Option<String>> {
    let outputs = describer
        .describe_stack_outputs(stack_name)
        .map_err(|message| LauncherError::Lookup(format!("stack '{stack_name}': {message}")))?;
    Ok(find_output(&outputs, output_key).map(str::to_string))
}

pub fn resolve_nested_output(
    describer: &impl StackDescriber,
    parent_stack: &str,
    logical_id: &str,
    output_key: &str,
) -> Result<Option<String>> {
    let nested_stack = resolve_nested_stack_id(describer, parent_stack, logical_id)?;
    resolve_endpoint(describer, &nested_stack, output_key)
}

fn resolve_nested_stack_id(
    describer: &impl StackDescriber,
    parent_stack: &str,
    logical_id: &str,
) -> Result<String> {
    let physical_ids = describer
        .describe_stack_resource(parent_stack, logical_id)
        .map_err(|message| {
            LauncherError::Lookup(format!(
                "resource '{logical_id}' in stack '{parent_stack}': {message}"
            ))
        })?;

    let mut matches = physical_ids.into_iter();
    let Some(first) = matches.next() else {
        return Err(LauncherError::Lookup(format!(
            "stack '{parent_stack}' has no resource '{logical_id}'"
        )));
    };
    let extra = matches.count();
    if extra > 0 {
        warn!(
            parent_stack,
            logical_id,
            extra,
            "multiple resources match nested stack; using the first"
        );
    }
    Ok(first)
}

struct OutputResolver<'a, D> {
    describer: &'a D,
    stack_name: &'a str,
    nested_ids: BTreeMap<String, String>,
}

impl<'a, D: StackDescriber> OutputResolver<'a, D> {
    fn new(describer: &'a D, stack_name: &'a str) -> Self {
        Self {
            describer,
            stack_name,
            nested_ids: BTreeMap::new(),
        }
    }

    fn require(&mut self, output_ref: &OutputRef) -> Result<String> {
        let stack = match &output_ref.nested_stack {
            None => self.stack_name.to_string(),
            Some(logical_id) => self.nested_stack_id(logical_id)?,
        };
        resolve_endpoint(self.describer, &stack, &output_ref.output)?.ok_or_else(|| {
            LauncherError::Lookup(format!(
                "stack '{stack}' has no output '{}'",
                output_ref.output
            ))
        })
    }

    fn nested_stack_id(&mut self, logical_id: &str) -> Result<String> {
        if let Some(physical_id) = self.nested_ids.get(logical_id) {
            return Ok(physical_id.clone());
        }
        let physical_id = resolve_nested_stack_id(self.describer, self.stack_name, logical_id)?;
        self.nested_ids
            .insert(logical_id.to_string(), physical_id.clone());
        Ok(physical_id)
    }
}

pub fn resolve_infrastructure(
    describer: &impl StackDescriber,
    config: &InfrastructureConfig,
) -> Result<ResolvedInfrastructure> {
    let mut resolver = OutputResolver::new(describer, &config.stack_name);

    let database_endpoint = resolver.require(&config.database_endpoint)?;
    info!(endpoint = %database_endpoint, "DB Endpoint: {database_endpoint}");

    let subnets = config
        .subnets
        .iter()
        .map(|output_ref| resolver.require(output_ref))
        .collect::<Result<Vec<_>>>()?;
    info!("Subnets: {}", subnets.join(", "));

    let security_groups = config
        .security_groups
        .iter()
        .map(|output_ref| resolver.require(output_ref))
        .collect::<Result<Vec<_>>>()?;
    info!("Security Groups: {}", security_groups.join(", "));

    Ok(ResolvedInfrastructure {
        database_endpoint,
        subnets,
        security_groups,
    })
}

/// Resolves the stacks and builds the specification without touching the
/// scheduler.
pub fn prepare_task_specification(
    describer: &impl StackDescriber,
    config: &LauncherConfig,
    password: &str,
) -> Result<(ResolvedInfrastructure, TaskSpecification)> {
    info!(stack = %config.infrastructure.stack_name, "Getting infrastructure details...");
    let infrastructure = resolve_infrastructure(describer, &config.infrastructure)?;
    let spec = build_task_specification(config, &infrastructure.database_endpoint, password);
    Ok((infrastructure, spec))
}

pub fn register_and_launch(
    scheduler: &impl TaskScheduler,
    spec: &TaskSpecification,
    cluster: &ClusterConfig,
    infrastructure: &ResolvedInfrastructure,
) -> Result<LaunchedTask> {
    info!(family = %spec.family, fingerprint = %spec.fingerprint(), "Creating migration task definition...");
    let task_definition_arn = scheduler
        .register_task_definition(spec)
        .map_err(|message| LauncherError::service("RegisterTaskDefinition", message))?;
    info!("Task Definition: {task_definition_arn}");

    let request = LaunchRequest {
        cluster: cluster.name.clone(),
        task_definition: task_definition_arn.clone(),
        launch_type: cluster.launch_type.clone(),
        subnets: infrastructure.subnets.clone(),
        security_groups: infrastructure.security_groups.clone(),
        assign_public_ip: cluster.assign_public_ip,
        started_by: cluster.started_by.clone(),
    };

    info!(cluster = %request.cluster, launch_type = %request.launch_type, "Running migration task...");
    let response = scheduler
        .run_task(&request)
        .map_err(|message| LauncherError::service("RunTask", message))?;

    if !response.failures.is_empty() {
        for failure in &response.failures {
            error!(%failure, "Failed to start task");
        }
        return Err(LauncherError::LaunchRejected(response.failures));
    }

    let mut task_arns = response.task_arns.into_iter();
    let Some(task_arn) = task_arns.next() else {
        error!("RunTask returned neither a task nor a failure");
        return Err(LauncherError::LaunchRejected(Vec::new()));
    };
    if task_arns.next().is_some() {
        warn!("RunTask started more than one task; watching the first");
    }
    info!("Migration task started: {task_arn}");

    Ok(LaunchedTask {
        cluster: request.cluster,
        task_definition_arn,
        task_arn,
    })
}

pub fn await_terminal(
    scheduler: &impl TaskScheduler,
    pause: &impl Pause,
    task: &LaunchedTask,
    policy: &PollPolicy,
    options: WaitOptions,
    cancel: &CancellationToken,
) -> Result<WaitResult> {
    info!(
        max_attempts = policy.max_attempts,
        budget_secs = policy.total_budget().as_secs(),
        "Waiting for task to complete..."
    );

    let mut last_status: Option<TaskStatus> = None;
    let mut polls = 0u32;

    for delay in policy.delays() {
        if !pause.pause(delay, cancel) {
            warn!(task_arn = %task.task_arn, "cancelled while waiting for task");
            let stop_requested =
                options.stop_on_cancel && request_stop(scheduler, task, CANCEL_STOP_REASON);
            return Ok(WaitResult {
                outcome: WaitOutcome::Cancelled {
                    last_status,
                    stop_requested,
                },
                polls,
            });
        }

        let observation = scheduler
            .describe_task(&task.cluster, &task.task_arn)
            .map_err(|message| LauncherError::service("DescribeTasks", message))?
            .ok_or_else(|| {
                LauncherError::service(
                    "DescribeTasks",
                    format!("task {} was not found in cluster {}", task.task_arn, task.cluster),
                )
            })?;
        polls += 1;
        info!(poll = polls, status = %observation.status, "Task Status: {}", observation.status);

        if observation.status.is_terminal() {
            let exit_code = observation.exit_code();
            return Ok(WaitResult {
                outcome: WaitOutcome::Stopped {
                    exit_code,
                    stopped_reason: observation.stopped_reason,
                },
                polls,
            });
        }
        last_status = Some(observation.status);
    }

    let stop_requested =
        options.stop_on_timeout && request_stop(scheduler, task, TIMEOUT_STOP_REASON);
    Ok(WaitResult {
        outcome: WaitOutcome::StillRunning {
            last_status,
            stop_requested,
        },
        polls,
    })
}

fn request_stop(scheduler: &impl TaskScheduler, task: &LaunchedTask, reason: &str) -> bool {
    match scheduler.stop_task(&task.cluster, &task.task_arn, reason) {
        Ok(()) => {
            warn!(task_arn = %task.task_arn, reason, "requested task stop");
            true
        }
        Err(message) => {
            error!(task_arn = %task.task_arn, error = %message, "failed to stop task");
            false
        }
    }
}

pub fn run_migration(
    describer: &impl StackDescriber,
    scheduler: &impl TaskScheduler,
    pause: &impl Pause,
    config: &LauncherConfig,
    password: &str,
    cancel: &CancellationToken,
) -> Result<MigrationReport> {
    let policy = PollPolicy::from_config(&config.polling)?;
    let (infrastructure, spec) = prepare_task_specification(describer, config, password)?;

    if cancel.is_cancelled() {
        return Err(LauncherError::Cancelled);
    }
    let fingerprint = spec.fingerprint();
    let task = register_and_launch(scheduler, &spec, &config.cluster, &infrastructure)?;
    let result = await_terminal(
        scheduler,
        pause,
        &task,
        &policy,
        WaitOptions::from(&config.polling),
        cancel,
    )?;

    Ok(MigrationReport {
        task,
        fingerprint,
        polls: result.polls,
        outcome: result.outcome,
    })
}
