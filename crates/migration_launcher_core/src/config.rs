use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::polling::PollPolicy;

pub const DEFAULT_PASSWORD_ENV: &str = "MIGRATION_DATABASE_PASSWORD";
pub const DEFAULT_DATABASE_URL_VARIABLE: &str = "DATABASE_URL";
pub const DEFAULT_STARTED_BY: &str = "migration-launcher";
pub const SUPPORTED_LAUNCH_TYPES: [&str; 3] = ["FARGATE", "EC2", "EXTERNAL"];
const MAX_FAMILY_LEN: usize = 255;
const MAX_STARTED_BY_LEN: usize = 128;

/// A config value that parsed but cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LauncherConfig {
    #[serde(default)]
    pub aws: AwsConfig,
    pub infrastructure: InfrastructureConfig,
    pub database: DatabaseConfig,
    pub task: TaskConfig,
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
}

/// Where each runtime parameter lives in the deployed stacks.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InfrastructureConfig {
    pub stack_name: String,
    pub database_endpoint: OutputRef,
    pub subnets: Vec<OutputRef>,
    pub security_groups: Vec<OutputRef>,
}

/// One stack output, read from `stack_name` directly or from one of its
/// nested stacks addressed by logical resource id.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OutputRef {
    #[serde(default)]
    pub nested_stack: Option<String>,
    pub output: String,
}

impl OutputRef {
    pub fn top_level(output: impl Into<String>) -> Self {
        Self {
            nested_stack: None,
            output: output.into(),
        }
    }

    pub fn nested(logical_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            nested_stack: Some(logical_id.into()),
            output: output.into(),
        }
    }
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.nested_stack {
            Some(logical_id) => write!(f, "{logical_id}/{}", self.output),
            None => f.write_str(&self.output),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_password_env")]
    pub password_env: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub name: String,
    #[serde(default = "default_url_variable")]
    pub url_variable: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    pub family: String,
    pub execution_role_arn: String,
    #[serde(default)]
    pub task_role_arn: Option<String>,
    #[serde(default = "default_cpu")]
    pub cpu: u32,
    #[serde(default = "default_memory")]
    pub memory: u32,
    #[serde(default = "default_container_name")]
    pub container_name: String,
    pub image: String,
    pub command: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// `requiresCompatibilities` of the registered task definition. Must
    /// include the launch type the cluster section runs it with.
    #[serde(default = "default_compatibilities")]
    pub compatibilities: Vec<String>,
    pub logs: LogConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    pub group: String,
    pub region: String,
    #[serde(default = "default_stream_prefix")]
    pub stream_prefix: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    pub name: String,
    #[serde(default = "default_launch_type")]
    pub launch_type: String,
    #[serde(default)]
    pub assign_public_ip: bool,
    #[serde(default = "default_started_by")]
    pub started_by: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub max_interval_secs: Option<u64>,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub stop_on_timeout: bool,
    #[serde(default = "default_stop_on_cancel")]
    pub stop_on_cancel: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_interval_secs: None,
            multiplier: default_multiplier(),
            max_attempts: default_max_attempts(),
            stop_on_timeout: false,
            stop_on_cancel: default_stop_on_cancel(),
        }
    }
}

fn default_scheme() -> String {
    "postgresql".to_string()
}

fn default_password_env() -> String {
    DEFAULT_PASSWORD_ENV.to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_url_variable() -> String {
    DEFAULT_DATABASE_URL_VARIABLE.to_string()
}

fn default_cpu() -> u32 {
    256
}

fn default_memory() -> u32 {
    512
}

fn default_container_name() -> String {
    "migration".to_string()
}

fn default_compatibilities() -> Vec<String> {
    vec![default_launch_type()]
}

fn default_stream_prefix() -> String {
    "migration".to_string()
}

fn default_launch_type() -> String {
    "FARGATE".to_string()
}

fn default_started_by() -> String {
    DEFAULT_STARTED_BY.to_string()
}

fn default_interval_secs() -> u64 {
    10
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_max_attempts() -> u32 {
    12
}

fn default_stop_on_cancel() -> bool {
    true
}

pub fn load_config(path: &Path) -> Result<LauncherConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> Result<LauncherConfig, ConfigError> {
    let config: LauncherConfig = toml::from_str(text)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &LauncherConfig) -> Result<(), ValidationError> {
    let infrastructure = &config.infrastructure;
    require_non_empty("infrastructure.stack_name", &infrastructure.stack_name)?;
    validate_output_ref(
        "infrastructure.database_endpoint",
        &infrastructure.database_endpoint,
    )?;
    if infrastructure.subnets.is_empty() {
        return Err(ValidationError::new(
            "infrastructure.subnets must list at least one output",
        ));
    }
    for (index, output_ref) in infrastructure.subnets.iter().enumerate() {
        validate_output_ref(&format!("infrastructure.subnets[{index}]"), output_ref)?;
    }
    if infrastructure.security_groups.is_empty() {
        return Err(ValidationError::new(
            "infrastructure.security_groups must list at least one output",
        ));
    }
    for (index, output_ref) in infrastructure.security_groups.iter().enumerate() {
        validate_output_ref(
            &format!("infrastructure.security_groups[{index}]"),
            output_ref,
        )?;
    }

    let database = &config.database;
    require_non_empty("database.scheme", &database.scheme)?;
    require_non_empty("database.user", &database.user)?;
    require_non_empty("database.name", &database.name)?;
    require_non_empty("database.url_variable", &database.url_variable)?;
    if database.password.is_none() {
        require_non_empty("database.password_env", &database.password_env)?;
    }
    if database.port == 0 {
        return Err(ValidationError::new("database.port must be non-zero"));
    }

    let task = &config.task;
    validate_family(&task.family)?;
    validate_arn("task.execution_role_arn", &task.execution_role_arn)?;
    if let Some(task_role_arn) = &task.task_role_arn {
        validate_arn("task.task_role_arn", task_role_arn)?;
    }
    if task.cpu == 0 {
        return Err(ValidationError::new("task.cpu must be a positive integer"));
    }
    if task.memory == 0 {
        return Err(ValidationError::new(
            "task.memory must be a positive integer",
        ));
    }
    require_non_empty("task.container_name", &task.container_name)?;
    require_non_empty("task.image", &task.image)?;
    if task.command.is_empty() || task.command.iter().all(|part| part.trim().is_empty()) {
        return Err(ValidationError::new("task.command cannot be empty"));
    }
    if task.environment.keys().any(|key| key.trim().is_empty()) {
        return Err(ValidationError::new(
            "task.environment keys must be non-empty strings",
        ));
    }
    if task.environment.contains_key(&database.url_variable) {
        return Err(ValidationError::new(format!(
            "task.environment must not set '{}'; it is derived from the database section",
            database.url_variable
        )));
    }
    require_non_empty("task.logs.group", &task.logs.group)?;
    require_non_empty("task.logs.region", &task.logs.region)?;
    require_non_empty("task.logs.stream_prefix", &task.logs.stream_prefix)?;
    if task.compatibilities.is_empty() {
        return Err(ValidationError::new(
            "task.compatibilities must list at least one launch type",
        ));
    }
    for compatibility in &task.compatibilities {
        validate_launch_type("task.compatibilities", compatibility)?;
    }

    let cluster = &config.cluster;
    require_non_empty("cluster.name", &cluster.name)?;
    validate_launch_type("cluster.launch_type", &cluster.launch_type)?;
    if !task.compatibilities.contains(&cluster.launch_type) {
        return Err(ValidationError::new(format!(
            "cluster.launch_type '{}' is not listed in task.compatibilities",
            cluster.launch_type
        )));
    }
    require_non_empty("cluster.started_by", &cluster.started_by)?;
    if cluster.started_by.len() > MAX_STARTED_BY_LEN {
        return Err(ValidationError::new(format!(
            "cluster.started_by exceeds {MAX_STARTED_BY_LEN} characters"
        )));
    }

    PollPolicy::from_config(&config.polling)?;
    Ok(())
}

/// Picks the inline password when present, otherwise reads the variable
/// named by `password_env` through `lookup`.
pub fn resolve_password(
    database: &DatabaseConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ValidationError> {
    if let Some(password) = &database.password {
        if password.is_empty() {
            return Err(ValidationError::new("database.password cannot be empty"));
        }
        return Ok(password.clone());
    }

    match lookup(&database.password_env) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ValidationError::new(format!(
            "database password must be provided via database.password or the {} environment variable",
            database.password_env
        ))),
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn validate_output_ref(field: &str, output_ref: &OutputRef) -> Result<(), ValidationError> {
    require_non_empty(&format!("{field}.output"), &output_ref.output)?;
    if let Some(logical_id) = &output_ref.nested_stack {
        require_non_empty(&format!("{field}.nested_stack"), logical_id)?;
    }
    Ok(())
}

fn validate_family(family: &str) -> Result<(), ValidationError> {
    require_non_empty("task.family", family)?;
    if family.len() > MAX_FAMILY_LEN {
        return Err(ValidationError::new(format!(
            "task.family exceeds {MAX_FAMILY_LEN} characters"
        )));
    }
    if !family
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(ValidationError::new(
            "task.family may only contain letters, numbers, hyphens and underscores",
        ));
    }
    Ok(())
}

fn validate_launch_type(field: &str, value: &str) -> Result<(), ValidationError> {
    if !SUPPORTED_LAUNCH_TYPES.contains(&value) {
        return Err(ValidationError::new(format!(
            "{field} '{value}' is not one of {}",
            SUPPORTED_LAUNCH_TYPES.join(", ")
        )));
    }
    Ok(())
}

fn validate_arn(field: &str, value: &str) -> Result<(), ValidationError> {
    if !value.starts_with("arn:") {
        return Err(ValidationError::new(format!("{field} must be an ARN")));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use super::*;

    pub(crate) const SAMPLE_CONFIG: &str = r#"
[infrastructure]
stack_name = "app-main-stack"
database_endpoint = { output = "DBEndpoint" }
subnets = [
    { nested_stack = "NetworkStack", output = "PrivateSubnet1Id" },
    { nested_stack = "NetworkStack", output = "PrivateSubnet2Id" },
]
security_groups = [
    { nested_stack = "SecurityStack", output = "ECSSecurityGroupId" },
]

[database]
user = "app_admin"
name = "app"

[task]
family = "app-migration"
execution_role_arn = "arn:aws:iam::123456789012:role/ecs-task-execution-role"
image = "123456789012.dkr.ecr.us-east-1.amazonaws.com/app-backend:abc1234"
command = ["npm", "run", "migrate"]
environment = { NODE_ENV = "production" }

[task.logs]
group = "/ecs/production/backend"
region = "us-east-1"

[cluster]
name = "production-cluster"
"#;

    pub(crate) fn sample_config() -> LauncherConfig {
        parse_config(SAMPLE_CONFIG).expect("sample config should parse")
    }

    #[test]
    fn parse_config_applies_defaults() {
        let config = sample_config();

        assert_eq!(config.database.scheme, "postgresql");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.password_env, DEFAULT_PASSWORD_ENV);
        assert_eq!(config.database.url_variable, "DATABASE_URL");
        assert_eq!(config.task.cpu, 256);
        assert_eq!(config.task.memory, 512);
        assert_eq!(config.task.container_name, "migration");
        assert_eq!(config.task.logs.stream_prefix, "migration");
        assert_eq!(config.task.compatibilities, vec!["FARGATE"]);
        assert_eq!(config.cluster.launch_type, "FARGATE");
        assert!(!config.cluster.assign_public_ip);
        assert_eq!(config.cluster.started_by, DEFAULT_STARTED_BY);
        assert_eq!(config.polling, PollingConfig::default());
        assert_eq!(config.aws, AwsConfig::default());
    }

    #[test]
    fn example_config_is_valid() {
        let config = parse_config(include_str!("../../../config/migration.example.toml"))
            .expect("example config should parse");

        assert_eq!(config.aws.region.as_deref(), Some("us-east-1"));
        assert_eq!(config.infrastructure.subnets.len(), 2);
        assert_eq!(config.database.password, None);
    }

    #[test]
    fn parse_config_reads_nested_output_refs() {
        let config = sample_config();

        assert_eq!(
            config.infrastructure.database_endpoint,
            OutputRef::top_level("DBEndpoint")
        );
        assert_eq!(
            config.infrastructure.subnets,
            vec![
                OutputRef::nested("NetworkStack", "PrivateSubnet1Id"),
                OutputRef::nested("NetworkStack", "PrivateSubnet2Id"),
            ]
        );
        assert_eq!(
            config.infrastructure.security_groups[0].to_string(),
            "SecurityStack/ECSSecurityGroupId"
        );
    }

    #[test]
    fn parse_config_rejects_unknown_fields() {
        let text = SAMPLE_CONFIG.replace("[cluster]", "[cluster]\nregion = \"us-east-1\"");
        let error = parse_config(&text).expect_err("unknown field should fail");
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn validate_config_requires_subnets() {
        let mut config = sample_config();
        config.infrastructure.subnets.clear();

        let error = validate_config(&config).expect_err("config should fail");
        assert!(error.message().contains("infrastructure.subnets"));
    }

    #[test]
    fn validate_config_rejects_database_url_override() {
        let mut config = sample_config();
        config
            .task
            .environment
            .insert("DATABASE_URL".to_string(), "postgresql://elsewhere".to_string());

        let error = validate_config(&config).expect_err("config should fail");
        assert!(error.message().contains("DATABASE_URL"));
    }

    #[test]
    fn validate_config_rejects_invalid_family() {
        let mut config = sample_config();
        config.task.family = "app migration".to_string();

        let error = validate_config(&config).expect_err("config should fail");
        assert!(error.message().contains("task.family"));
    }

    #[test]
    fn validate_config_rejects_unknown_launch_type() {
        let mut config = sample_config();
        config.cluster.launch_type = "LAMBDA".to_string();

        let error = validate_config(&config).expect_err("config should fail");
        assert!(error.message().contains("cluster.launch_type"));
    }

    #[test]
    fn validate_config_requires_launch_type_in_compatibilities() {
        let mut config = sample_config();
        config.cluster.launch_type = "EC2".to_string();

        let error = validate_config(&config).expect_err("config should fail");
        assert_eq!(
            error.message(),
            "cluster.launch_type 'EC2' is not listed in task.compatibilities"
        );

        config.task.compatibilities = vec!["EC2".to_string(), "FARGATE".to_string()];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn validate_config_rejects_unknown_compatibility() {
        let mut config = sample_config();
        config.task.compatibilities.push("LAMBDA".to_string());

        let error = validate_config(&config).expect_err("config should fail");
        assert!(error.message().starts_with("task.compatibilities 'LAMBDA'"));
    }

    #[test]
    fn validation_error_displays_message() {
        let error = ValidationError::new("task.image cannot be empty");
        assert_eq!(error.to_string(), "task.image cannot be empty");
        assert_eq!(
            ConfigError::from(error).to_string(),
            "invalid config: task.image cannot be empty"
        );
    }

    #[test]
    fn validate_config_rejects_non_arn_role() {
        let mut config = sample_config();
        config.task.execution_role_arn = "production-ecs-task-execution-role".to_string();

        let error = validate_config(&config).expect_err("config should fail");
        assert_eq!(error.message(), "task.execution_role_arn must be an ARN");
    }

    #[test]
    fn validate_config_rejects_zero_poll_attempts() {
        let mut config = sample_config();
        config.polling.max_attempts = 0;

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn resolve_password_prefers_inline_value() {
        let mut database = sample_config().database;
        database.password = Some("inline-secret".to_string());

        let password = resolve_password(&database, |_| Some("env-secret".to_string()))
            .expect("password should resolve");
        assert_eq!(password, "inline-secret");
    }

    #[test]
    fn resolve_password_reads_named_environment_variable() {
        let database = sample_config().database;

        let password = resolve_password(&database, |name| {
            (name == DEFAULT_PASSWORD_ENV).then(|| "env-secret".to_string())
        })
        .expect("password should resolve");
        assert_eq!(password, "env-secret");
    }

    #[test]
    fn resolve_password_fails_when_unset() {
        let database = sample_config().database;

        let error = resolve_password(&database, |_| None).expect_err("password should fail");
        assert!(error.message().contains(DEFAULT_PASSWORD_ENV));
    }

    #[test]
    fn load_config_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE_CONFIG.as_bytes())
            .expect("write config");

        let config = load_config(file.path()).expect("config should load");
        assert_eq!(config.cluster.name, "production-cluster");
    }

    #[test]
    fn load_config_reports_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing.toml");

        let error = load_config(&missing).expect_err("missing file should fail");
        assert!(matches!(error, ConfigError::Io { .. }));
        assert!(error.to_string().contains("missing.toml"));
    }
}
