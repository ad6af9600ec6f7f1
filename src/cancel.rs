use crate::{HarvestError, Result};
use std::time::Duration;
use tokio::sync::watch;

/// Cooperative cancellation for a running harvest.
///
/// - `cancel()` flips a flag and wakes sleepers.
/// - `reset()` clears the flag so a later harvest can run.
/// - Throttle and backoff sleeps select on the timer and the flag.
///
/// Clones share the same flag.
#[derive(Clone, Debug)]
pub struct CancellationState {
    tx: watch::Sender<bool>,
}

impl Default for CancellationState {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn reset(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Fail with [`HarvestError::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(HarvestError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration` unless cancelled first.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        sleep_with_cancel(self.subscribe(), duration).await
    }
}

pub async fn sleep_with_cancel(
    mut cancel_rx: watch::Receiver<bool>,
    duration: Duration,
) -> Result<()> {
    if *cancel_rx.borrow() {
        return Err(HarvestError::Cancelled);
    }

    let sleeper = tokio::time::sleep(duration);
    tokio::pin!(sleeper);
    tokio::select! {
        _ = &mut sleeper => Ok(()),
        _ = async {
            loop {
                if cancel_rx.changed().await.is_err() {
                    // Sender dropped; nothing can cancel us any more.
                    std::future::pending::<()>().await;
                }
                if *cancel_rx.borrow() {
                    break;
                }
            }
        } => Err(HarvestError::Cancelled),
    }
}
