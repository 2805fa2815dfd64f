//! Ctrl-C handling for the launcher binary.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Cancels `cancel` on the first interrupt. Returns `true` once a second
/// interrupt arrives, at which point the caller should exit without
/// waiting for in-flight AWS calls. Returns `false` if the signal source
/// fails before that.
pub async fn forward_interrupts<F, Fut>(mut next_interrupt: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_interrupt().await.is_err() {
        return false;
    }
    warn!("interrupt received; cancelling wait (press Ctrl-C again to exit immediately)");
    cancel.cancel();

    if next_interrupt().await.is_err() {
        return false;
    }
    warn!("second interrupt received; exiting");
    true
}
