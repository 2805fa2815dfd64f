use migration_launcher_core::stack::StackOutput;

pub trait StackDescriber {
    fn describe_stack_outputs(&self, stack_name: &str) -> Result<Vec<StackOutput>, String>;

    /// Physical ids of the resources under `logical_id` in `parent_stack`.
    fn describe_stack_resource(
        &self,
        parent_stack: &str,
        logical_id: &str,
    ) -> Result<Vec<String>, String>;
}
