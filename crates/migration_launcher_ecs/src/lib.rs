//! AWS-oriented adapters and the orchestration sequence for one-shot
//! migration tasks.
//!
//! Domain types, configuration and policies live in
//! `migration_launcher_core`. This crate owns the adapter seams
//! (CloudFormation, ECS, pausing), their AWS SDK implementations, the
//! launcher handler, interrupt forwarding and the CLI surface of the `run_migrations` binary.

pub mod adapters;
pub mod aws;
pub mod cli;
pub mod errors;
pub mod handlers;
pub mod interrupt;
pub mod logging;
