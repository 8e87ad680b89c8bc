use tokio::runtime::{Handle, TryCurrentError};

use super::{cancellable::CancellableTask, monotonic_now, Duration, Scheduler, Task, TaskHandle};

/// Runs tasks as tokio tasks on the given runtime.
#[derive(Clone)]
pub struct TokioScheduler {
  runtime: Handle,
}

impl TokioScheduler {
  pub fn new(runtime: Handle) -> Self { TokioScheduler { runtime } }

  /// Bind to the runtime the caller is running on.
  pub fn try_current() -> Result<Self, TryCurrentError> { Ok(TokioScheduler::new(Handle::try_current()?)) }
}

impl Scheduler for TokioScheduler {
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let sleep = tokio::time::sleep(delay.unwrap_or(Duration::ZERO));
    self
      .runtime
      .spawn(CancellableTask::new(sleep, task, handle.clone()));
    handle
  }

  fn now(&self) -> Duration { monotonic_now() }
}

#[cfg(test)]
mod test {
  use super::*;

  #[tokio::test(flavor = "multi_thread")]
  async fn runs_on_runtime() {
    let scheduler = TokioScheduler::try_current().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();
    scheduler.schedule(Box::new(move || { let _ = tx.send(7); }), Some(Duration::from_millis(5)));
    assert_eq!(rx.await.unwrap(), 7);
  }
}
