//! One-shot session reload timer.
//!
//! The feed is not reconnected in-place on staleness; instead the whole
//! session is rebuilt on a fixed interval. This timer drives that cycle.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default session lifetime before a full reload: five minutes.
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_millis(300_000);

/// Marker sent when the reload timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadFired;

/// One-shot timer; aborted on cancel or drop so an ended session never leaks
/// a pending fire.
#[derive(Debug)]
pub struct ReloadTimer {
    task: JoinHandle<()>,
}

impl ReloadTimer {
    /// Arm the timer: exactly one [`ReloadFired`] is sent after `interval`.
    pub fn schedule(interval: Duration, tx: mpsc::Sender<ReloadFired>) -> Self {
        let task = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            debug!("reload timer fired after {:?}", interval);
            let _ = tx.send(ReloadFired).await;
        });

        Self { task }
    }

    /// Cancel the pending fire. Idempotent; a no-op once fired.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for ReloadTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
