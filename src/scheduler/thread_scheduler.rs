use std::thread;

use super::{monotonic_now, Duration, Scheduler, Task, TaskHandle};
use crate::subscription::Subscription;

/// Runs every task on a newly spawned thread.
#[derive(Clone, Copy, Default)]
pub struct NewThreadScheduler;

impl Scheduler for NewThreadScheduler {
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let c_handle = handle.clone();
    thread::spawn(move || {
      if let Some(delay) = delay {
        thread::sleep(delay);
      }
      if !c_handle.is_closed() {
        task();
        c_handle.mark_finished();
      }
    });
    handle
  }

  fn now(&self) -> Duration { monotonic_now() }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc, Arc,
  };

  use super::*;

  #[test]
  fn runs_on_another_thread() {
    let (tx, rx) = mpsc::channel();
    let caller = thread::current().id();
    NewThreadScheduler.schedule(
      Box::new(move || tx.send(thread::current().id()).unwrap()),
      Some(Duration::from_millis(1)),
    );
    let worker = rx.recv().unwrap();
    assert_ne!(caller, worker);
  }

  #[test]
  fn cancelled_task_does_not_run() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let handle = NewThreadScheduler.schedule(
      Box::new(move || {
        c_hits.fetch_add(1, Ordering::SeqCst);
      }),
      Some(Duration::from_millis(50)),
    );
    handle.unsubscribe();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
  }
}
