use serde::Serialize;

/// Reported when the stopped task's first container carries no exit code.
pub const MISSING_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum TaskStatus {
    Provisioning,
    Pending,
    Activating,
    Running,
    Deactivating,
    Stopping,
    Deprovisioning,
    Stopped,
    Unknown(String),
}

impl TaskStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "PROVISIONING" => Self::Provisioning,
            "PENDING" => Self::Pending,
            "ACTIVATING" => Self::Activating,
            "RUNNING" => Self::Running,
            "DEACTIVATING" => Self::Deactivating,
            "STOPPING" => Self::Stopping,
            "DEPROVISIONING" => Self::Deprovisioning,
            "STOPPED" => Self::Stopped,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Provisioning => "PROVISIONING",
            Self::Pending => "PENDING",
            Self::Activating => "ACTIVATING",
            Self::Running => "RUNNING",
            Self::Deactivating => "DEACTIVATING",
            Self::Stopping => "STOPPING",
            Self::Deprovisioning => "DEPROVISIONING",
            Self::Stopped => "STOPPED",
            Self::Unknown(value) => value,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        value.as_str().to_string()
    }
}

/// One status poll result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskObservation {
    pub status: TaskStatus,
    pub container_exit_codes: Vec<Option<i32>>,
    pub stopped_reason: Option<String>,
}

impl TaskObservation {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            container_exit_codes: Vec::new(),
            stopped_reason: None,
        }
    }

    /// Exit code of the first container, or [`MISSING_EXIT_CODE`].
    pub fn exit_code(&self) -> i32 {
        self.container_exit_codes
            .first()
            .copied()
            .flatten()
            .unwrap_or(MISSING_EXIT_CODE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchFailure {
    pub arn: Option<String>,
    pub reason: Option<String>,
    pub detail: Option<String>,
}

impl std::fmt::Display for LaunchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = self.reason.as_deref().unwrap_or("unknown reason");
        match (&self.arn, &self.detail) {
            (Some(arn), Some(detail)) => write!(f, "{reason} ({arn}): {detail}"),
            (Some(arn), None) => write!(f, "{reason} ({arn})"),
            (None, Some(detail)) => write!(f, "{reason}: {detail}"),
            (None, None) => f.write_str(reason),
        }
    }
}

/// What the scheduler answered to a launch request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchResponse {
    pub task_arns: Vec<String>,
    pub failures: Vec<LaunchFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub cluster: String,
    pub task_definition: String,
    pub launch_type: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub assign_public_ip: bool,
    pub started_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchedTask {
    pub cluster: String,
    pub task_definition_arn: String,
    pub task_arn: String,
}
