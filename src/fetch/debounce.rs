//! A single cancellable scheduled task.

use futures::future::BoxFuture;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Runs a task only after a quiet period with no newer task scheduled.
///
/// Scheduling a task cancels whichever task is still waiting. Once the quiet
/// period elapses the task is detached onto its own tokio task, so a later
/// schedule never cancels work that has already started.
pub struct Debouncer {
  delay: Duration,
  pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      pending: Mutex::new(None),
    }
  }

  /// Schedule `task` to run after the quiet period, superseding any waiting task.
  pub fn schedule(&self, task: BoxFuture<'static, ()>) {
    let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(previous) = pending.take() {
      if !previous.is_finished() {
        debug!("debounced task superseded");
      }
      previous.abort();
    }

    let delay = self.delay;
    *pending = Some(tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      tokio::spawn(task);
    }));
  }

  /// Cancel the waiting task, if any.
  pub fn cancel(&self) {
    if let Some(previous) = self
      .pending
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .take()
    {
      previous.abort();
    }
  }

  /// Whether a task is still waiting out its quiet period.
  #[cfg(test)]
  pub fn is_pending(&self) -> bool {
    self
      .pending
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .as_ref()
      .is_some_and(|handle| !handle.is_finished())
  }
}

impl Drop for Debouncer {
  fn drop(&mut self) {
    self.cancel();
  }
}
