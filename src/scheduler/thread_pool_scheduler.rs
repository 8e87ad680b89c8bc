use futures::executor::ThreadPool;
use futures_time::time::Duration as SleepDuration;

use super::{cancellable::CancellableTask, monotonic_now, Duration, Scheduler, Task, TaskHandle};

/// Runs tasks on a `futures` thread pool. Delays are timers, not blocked
/// threads.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

impl ThreadPoolScheduler {
  /// Create a scheduler backed by a new pool with one thread per core.
  pub fn new() -> std::io::Result<Self> { Ok(ThreadPoolScheduler { pool: ThreadPool::new()? }) }

  /// Share an existing pool.
  pub fn from_pool(pool: ThreadPool) -> Self { ThreadPoolScheduler { pool } }
}

impl Scheduler for ThreadPoolScheduler {
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let delay = SleepDuration::from(delay.unwrap_or(Duration::ZERO));
    let sleep = futures_time::task::sleep(delay);
    self
      .pool
      .spawn_ok(CancellableTask::new(sleep, task, handle.clone()));
    handle
  }

  fn now(&self) -> Duration { monotonic_now() }
}

#[cfg(test)]
mod test {
  use std::sync::mpsc;

  use super::*;
  use crate::subscription::Subscription;

  #[test]
  fn runs_delayed_task() {
    let scheduler = ThreadPoolScheduler::new().unwrap();
    let (tx, rx) = mpsc::channel();
    let start = scheduler.now();
    scheduler.schedule(Box::new(move || tx.send(()).unwrap()), Some(Duration::from_millis(20)));
    rx.recv().unwrap();
    assert!(scheduler.now() - start >= Duration::from_millis(20));
  }

  #[test]
  fn cancelled_before_due() {
    let scheduler = ThreadPoolScheduler::new().unwrap();
    let (tx, rx) = mpsc::channel::<()>();
    let handle = scheduler.schedule(Box::new(move || tx.send(()).unwrap()), Some(Duration::from_millis(30)));
    handle.unsubscribe();
    assert!(rx.recv_timeout(std::time::Duration::from_millis(80)).is_err());
  }
}
