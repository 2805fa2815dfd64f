use serde::Serialize;

use crate::lifecycle::{LaunchedTask, TaskStatus};

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MIGRATION_FAILED: u8 = 2;
pub const EXIT_STILL_RUNNING: u8 = 3;
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WaitOutcome {
    Stopped {
        exit_code: i32,
        stopped_reason: Option<String>,
    },
    StillRunning {
        last_status: Option<TaskStatus>,
        stop_requested: bool,
    },
    Cancelled {
        last_status: Option<TaskStatus>,
        stop_requested: bool,
    },
}

impl WaitOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped { .. })
    }
}

/// How the launcher's own exit status reflects the migration result.
///
/// `Observational` keeps exit 0 whenever the task was launched, whatever
/// the container did. `Strict` maps a failed or unfinished migration to a
/// non-zero status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitPolicy {
    #[default]
    Observational,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub task: LaunchedTask,
    pub fingerprint: String,
    pub polls: u32,
    #[serde(flatten)]
    pub outcome: WaitOutcome,
}

impl MigrationReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, WaitOutcome::Stopped { exit_code: 0, .. })
    }

    pub fn exit_status(&self, policy: ExitPolicy) -> u8 {
        match (&self.outcome, policy) {
            (WaitOutcome::Cancelled { .. }, _) => EXIT_CANCELLED,
            (_, ExitPolicy::Observational) => EXIT_OK,
            (WaitOutcome::Stopped { exit_code: 0, .. }, ExitPolicy::Strict) => EXIT_OK,
            (WaitOutcome::Stopped { .. }, ExitPolicy::Strict) => EXIT_MIGRATION_FAILED,
            (WaitOutcome::StillRunning { .. }, ExitPolicy::Strict) => EXIT_STILL_RUNNING,
        }
    }

    /// Human-readable closing lines for the outcome. `log_group` is where
    /// the container's CloudWatch output lands.
    pub fn summary(&self, log_group: &str) -> String {
        let task_arn = &self.task.task_arn;
        match &self.outcome {
            WaitOutcome::Stopped { exit_code: 0, .. } => {
                "Migrations completed successfully!".to_string()
            }
            WaitOutcome::Stopped {
                exit_code,
                stopped_reason,
            } => {
                let mut lines = vec![format!("Migrations failed with exit code: {exit_code}")];
                if let Some(reason) = stopped_reason {
                    lines.push(format!("Stopped reason: {reason}"));
                }
                lines.push(format!("Check CloudWatch logs for details: {log_group}"));
                lines.join("\n")
            }
            WaitOutcome::StillRunning {
                stop_requested: false,
                ..
            } => format!("Task still running. Check CloudWatch logs for progress: {log_group}"),
            WaitOutcome::StillRunning {
                stop_requested: true,
                ..
            } => format!("Task did not finish in time and was asked to stop: {task_arn}"),
            WaitOutcome::Cancelled {
                stop_requested: true,
                ..
            } => format!("Wait cancelled; stop requested for {task_arn}"),
            WaitOutcome::Cancelled {
                stop_requested: false,
                ..
            } => format!("Wait cancelled; task left running: {task_arn}"),
        }
    }
}
