//! One-shot timer slots.
//!
//! A `ScheduledTask` owns at most one pending tokio sleep.  Arming it again
//! aborts whatever was there first, and dropping the slot aborts it too, so a
//! timer can never outlive the state transition that armed it.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

#[derive(Debug, Default)]
pub struct ScheduledTask {
    handle: Option<AbortHandle>,
}

impl ScheduledTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post `event` on `tx` after `after`, replacing any pending task.
    pub fn schedule<E>(&mut self, after: Duration, tx: mpsc::UnboundedSender<E>, event: E)
    where
        E: Send + 'static,
    {
        self.cancel();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // receiver gone means the loop is shutting down
            let _ = tx.send(event);
        });
        self.handle = Some(task.abort_handle());
    }

    /// Abort the pending task, if any.  Safe to call any number of times.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Forget a task that has already fired.
    pub fn clear(&mut self) {
        self.handle = None;
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
