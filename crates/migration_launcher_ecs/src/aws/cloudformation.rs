use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::types::Output;
use migration_launcher_core::stack::StackOutput;

use super::block_on;
use crate::adapters::stack_describer::StackDescriber;

pub struct CloudFormationStackDescriber {
    client: aws_sdk_cloudformation::Client,
}

impl CloudFormationStackDescriber {
    pub fn new(client: aws_sdk_cloudformation::Client) -> Self {
        Self { client }
    }
}

impl StackDescriber for CloudFormationStackDescriber {
    fn describe_stack_outputs(&self, stack_name: &str) -> Result<Vec<StackOutput>, String> {
        let client = self.client.clone();
        let name = stack_name.to_string();

        let response = block_on(async move { client.describe_stacks().stack_name(name).send().await })
            .map_err(|error| format!("failed to describe stack: {}", DisplayErrorContext(&error)))?;

        let stack = response
            .stacks()
            .first()
            .ok_or_else(|| format!("stack {stack_name} was not returned"))?;
        Ok(stack_outputs(stack.outputs()))
    }

    fn describe_stack_resource(
        &self,
        parent_stack: &str,
        logical_id: &str,
    ) -> Result<Vec<String>, String> {
        let client = self.client.clone();
        let stack_name = parent_stack.to_string();
        let logical_resource_id = logical_id.to_string();

        let response = block_on(async move {
            client
                .describe_stack_resources()
                .stack_name(stack_name)
                .logical_resource_id(logical_resource_id)
                .send()
                .await
        })
        .map_err(|error| {
            format!(
                "failed to describe stack resources: {}",
                DisplayErrorContext(&error)
            )
        })?;

        Ok(physical_ids(
            response
                .stack_resources()
                .iter()
                .map(|resource| resource.physical_resource_id()),
        ))
    }
}

/// Outputs missing either half of the pair are dropped.
pub fn stack_outputs(outputs: &[Output]) -> Vec<StackOutput> {
    outputs
        .iter()
        .filter_map(|output| match (output.output_key(), output.output_value()) {
            (Some(key), Some(value)) => Some(StackOutput::new(key, value)),
            _ => None,
        })
        .collect()
}

pub fn physical_ids<'a>(ids: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    ids.flatten()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
