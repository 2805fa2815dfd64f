use migration_launcher_core::lifecycle::{LaunchRequest, LaunchResponse, TaskObservation};
use migration_launcher_core::task_spec::TaskSpecification;

pub trait TaskScheduler {
    /// Registers a new revision and returns its ARN.
    fn register_task_definition(&self, spec: &TaskSpecification) -> Result<String, String>;

    fn run_task(&self, request: &LaunchRequest) -> Result<LaunchResponse, String>;

    /// `Ok(None)` when the scheduler no longer knows the task.
    fn describe_task(
        &self,
        cluster: &str,
        task_arn: &str,
    ) -> Result<Option<TaskObservation>, String>;

    fn stop_task(&self, cluster: &str, task_arn: &str, reason: &str) -> Result<(), String>;
}
