use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, Compatibility, ContainerDefinition, Failure,
    KeyValuePair, LaunchType, LogConfiguration, LogDriver, NetworkConfiguration, NetworkMode,
    Tag, Task,
};
use migration_launcher_core::lifecycle::{
    LaunchFailure, LaunchRequest, LaunchResponse, TaskObservation, TaskStatus,
};
use migration_launcher_core::task_spec::{ContainerSpec, TaskSpecification};
use tracing::debug;

use super::block_on;
use crate::adapters::scheduler::TaskScheduler;

pub struct EcsTaskScheduler {
    client: aws_sdk_ecs::Client,
}

impl EcsTaskScheduler {
    pub fn new(client: aws_sdk_ecs::Client) -> Self {
        Self { client }
    }
}

impl TaskScheduler for EcsTaskScheduler {
    fn register_task_definition(&self, spec: &TaskSpecification) -> Result<String, String> {
        let container = spec
            .primary_container()
            .ok_or_else(|| "task specification has no container".to_string())?;

        let mut request = self
            .client
            .register_task_definition()
            .family(&spec.family)
            .network_mode(NetworkMode::from(spec.network_mode.as_str()))
            .cpu(&spec.cpu)
            .memory(&spec.memory)
            .execution_role_arn(&spec.execution_role_arn)
            .set_task_role_arn(spec.task_role_arn.clone())
            .container_definitions(container_definition(container)?);
        for compatibility in &spec.requires_compatibilities {
            request = request.requires_compatibilities(Compatibility::from(compatibility.as_str()));
        }
        for tag in &spec.tags {
            request = request.tags(Tag::builder().key(&tag.key).value(&tag.value).build());
        }

        let response = block_on(request.send()).map_err(|error| {
            format!(
                "failed to register task definition: {}",
                DisplayErrorContext(&error)
            )
        })?;

        response
            .task_definition()
            .and_then(|definition| definition.task_definition_arn())
            .map(str::to_string)
            .ok_or_else(|| "RegisterTaskDefinition returned no task definition ARN".to_string())
    }

    fn run_task(&self, request: &LaunchRequest) -> Result<LaunchResponse, String> {
        let network_configuration = network_configuration(request)?;
        let call = self
            .client
            .run_task()
            .cluster(&request.cluster)
            .task_definition(&request.task_definition)
            .launch_type(LaunchType::from(request.launch_type.as_str()))
            .network_configuration(network_configuration)
            .started_by(&request.started_by)
            .count(1);

        let response = block_on(call.send())
            .map_err(|error| format!("failed to run task: {}", DisplayErrorContext(&error)))?;

        Ok(launch_response(response.tasks(), response.failures()))
    }

    fn describe_task(&self, cluster: &str, task_arn: &str) -> Result<Option<TaskObservation>, String> {
        let call = self
            .client
            .describe_tasks()
            .cluster(cluster)
            .tasks(task_arn);

        let response = block_on(call.send())
            .map_err(|error| format!("failed to describe task: {}", DisplayErrorContext(&error)))?;

        for failure in response.failures() {
            debug!(failure = %launch_failure(failure), "DescribeTasks reported a failure");
        }
        Ok(response
            .tasks()
            .iter()
            .find(|task| task.task_arn() == Some(task_arn))
            .or_else(|| response.tasks().first())
            .map(task_observation))
    }

    fn stop_task(&self, cluster: &str, task_arn: &str, reason: &str) -> Result<(), String> {
        let call = self
            .client
            .stop_task()
            .cluster(cluster)
            .task(task_arn)
            .reason(reason);

        block_on(call.send())
            .map(|_| ())
            .map_err(|error| format!("failed to stop task: {}", DisplayErrorContext(&error)))
    }
}

pub fn container_definition(container: &ContainerSpec) -> Result<ContainerDefinition, String> {
    let log_configuration = LogConfiguration::builder()
        .log_driver(LogDriver::from(
            container.log_configuration.log_driver.as_str(),
        ))
        .set_options(Some(
            container
                .log_configuration
                .options
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ))
        .build()
        .map_err(|error| format!("invalid log configuration: {error}"))?;

    let environment = container
        .environment
        .iter()
        .map(|variable| {
            KeyValuePair::builder()
                .name(&variable.name)
                .value(&variable.value)
                .build()
        })
        .collect();

    Ok(ContainerDefinition::builder()
        .name(&container.name)
        .image(&container.image)
        .essential(container.essential)
        .set_command(Some(container.command.clone()))
        .set_environment(Some(environment))
        .log_configuration(log_configuration)
        .build())
}

pub fn network_configuration(request: &LaunchRequest) -> Result<NetworkConfiguration, String> {
    let assign_public_ip = if request.assign_public_ip {
        AssignPublicIp::Enabled
    } else {
        AssignPublicIp::Disabled
    };
    let awsvpc = AwsVpcConfiguration::builder()
        .set_subnets(Some(request.subnets.clone()))
        .set_security_groups(Some(request.security_groups.clone()))
        .assign_public_ip(assign_public_ip)
        .build()
        .map_err(|error| format!("invalid network configuration: {error}"))?;

    Ok(NetworkConfiguration::builder()
        .awsvpc_configuration(awsvpc)
        .build())
}

pub fn launch_response(tasks: &[Task], failures: &[Failure]) -> LaunchResponse {
    LaunchResponse {
        task_arns: tasks
            .iter()
            .filter_map(|task| task.task_arn())
            .map(str::to_string)
            .collect(),
        failures: failures.iter().map(launch_failure).collect(),
    }
}

pub fn launch_failure(failure: &Failure) -> LaunchFailure {
    LaunchFailure {
        arn: failure.arn().map(str::to_string),
        reason: failure.reason().map(str::to_string),
        detail: failure.detail().map(str::to_string),
    }
}

pub fn task_observation(task: &Task) -> TaskObservation {
    TaskObservation {
        status: task
            .last_status()
            .map(TaskStatus::parse)
            .unwrap_or_else(|| TaskStatus::Unknown("UNKNOWN".to_string())),
        container_exit_codes: task
            .containers()
            .iter()
            .map(|container| container.exit_code())
            .collect(),
        stopped_reason: task.stopped_reason().map(str::to_string),
    }
}
