use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub trait Pause {
    /// Waits for `duration`. Returns `false` if `cancel` fired first.
    fn pause(&self, duration: Duration, cancel: &CancellationToken) -> bool;
}

/// Sleeps on the current Tokio runtime, woken early by cancellation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPause;

impl Pause for TokioPause {
    fn pause(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        let cancel = cancel.clone();
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                tokio::select! {
                    _ = cancel.cancelled() => false,
                    _ = tokio::time::sleep(duration) => true,
                }
            })
        })
    }
}
