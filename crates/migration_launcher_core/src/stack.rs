#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOutput {
    pub key: String,
    pub value: String,
}

impl StackOutput {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Exact-match lookup. The first output wins if a key repeats.
pub fn find_output<'a>(outputs: &'a [StackOutput], key: &str) -> Option<&'a str> {
    outputs
        .iter()
        .find(|output| output.key == key)
        .map(|output| output.value.as_str())
}

/// Every value the migration task needs from the deployed stacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInfrastructure {
    pub database_endpoint: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
}
