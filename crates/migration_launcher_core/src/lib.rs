//! Pure domain primitives for the migration launcher.
//!
//! This crate owns configuration, stack-output lookup, task specification
//! construction, the task lifecycle model, poll policy and run reporting.
//! It intentionally excludes AWS SDK and async runtime concerns.

pub mod config;
pub mod lifecycle;
pub mod polling;
pub mod report;
pub mod stack;
pub mod task_spec;
