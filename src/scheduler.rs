//! Scheduling capability for time-based operators.
//!
//! A [`Scheduler`] runs a boxed task, now or after a delay, and hands back a
//! [`TaskHandle`] that cancels it. Time-based operators (`timer`,
//! `interval`, `take_for`, `take_last_buffer_for`, `delay_subscription`)
//! take the scheduler as a value and read time only through [`Scheduler::now`]
//! or a [`Stopwatch`], so swapping in [`TestScheduler`] makes them fully
//! deterministic.
//!
//! | Scheduler | Runs tasks on | Feature |
//! |-----------|---------------|---------|
//! | [`NewThreadScheduler`] | a fresh OS thread per task | always |
//! | [`ThreadPoolScheduler`] | the `futures` thread pool | `futures-scheduler` |
//! | [`TokioScheduler`] | a tokio runtime | `tokio-scheduler` |
//! | [`TestScheduler`] | the calling thread, in virtual time | always |

use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::Instant,
};

pub use std::time::Duration;

use once_cell::sync::Lazy;

use crate::subscription::Subscription;

mod test_scheduler;
mod thread_scheduler;
pub use test_scheduler::TestScheduler;
pub use thread_scheduler::NewThreadScheduler;

#[cfg(feature = "futures-scheduler")]
mod thread_pool_scheduler;
#[cfg(feature = "futures-scheduler")]
pub use thread_pool_scheduler::ThreadPoolScheduler;

#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

#[cfg(any(feature = "futures-scheduler", feature = "tokio-scheduler"))]
mod cancellable;

/// A unit of work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Orders tasks and runs them, optionally after a delay.
pub trait Scheduler: Clone + Send + Sync + 'static {
  /// Run `task` after `delay` (or as soon as possible). Unsubscribing the
  /// returned handle before the task starts prevents it from running.
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle;

  /// Monotonic time as seen by this scheduler.
  fn now(&self) -> Duration;

  /// Start measuring elapsed time on this scheduler's clock.
  fn stopwatch(&self) -> Stopwatch<Self> {
    Stopwatch { scheduler: self.clone(), start: self.now() }
  }
}

/// Elapsed time measured on a scheduler's clock.
#[derive(Clone)]
pub struct Stopwatch<S> {
  scheduler: S,
  start: Duration,
}

impl<S: Scheduler> Stopwatch<S> {
  pub fn elapsed(&self) -> Duration { self.scheduler.now().saturating_sub(self.start) }
}

/// Cancellation handle of a scheduled task; closed once the task has run or
/// was cancelled.
#[derive(Clone, Default)]
pub struct TaskHandle(Arc<AtomicBool>);

impl TaskHandle {
  pub fn new() -> Self { Self::default() }

  pub(crate) fn mark_finished(&self) { self.0.store(true, Ordering::Release) }
}

impl Subscription for TaskHandle {
  fn unsubscribe(self) { self.0.store(true, Ordering::Release) }

  fn is_closed(&self) -> bool { self.0.load(Ordering::Acquire) }
}

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Wall-clock time since the first call, shared by the real-time schedulers.
pub(crate) fn monotonic_now() -> Duration { EPOCH.elapsed() }

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn handle_closes_on_cancel() {
    let handle = TaskHandle::new();
    assert!(!handle.is_closed());
    handle.clone().unsubscribe();
    assert!(handle.is_closed());
  }

  #[test]
  fn monotonic_clock_advances() {
    let a = monotonic_now();
    std::thread::sleep(Duration::from_millis(2));
    assert!(monotonic_now() > a);
  }
}
