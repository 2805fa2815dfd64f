//! AWS SDK implementations of the adapter traits.
//!
//! The adapters are synchronous; each call parks the current worker with
//! `block_in_place` and drives the SDK future on the ambient Tokio runtime.

use std::future::Future;

pub mod cloudformation;
pub mod ecs;

pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
