//! Test Scheduler for deterministic testing of time-based operators.
//!
//! Provides virtual time that only advances when explicitly instructed.
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! // Initialize the test scheduler (required before use)
//! TestScheduler::init();
//!
//! let ticks = std::sync::Arc::new(parking_lot::Mutex::new(vec![]));
//! let c_ticks = ticks.clone();
//! observable::interval(Duration::from_millis(10), TestScheduler)
//!   .take(3)
//!   .subscribe(move |v| c_ticks.lock().push(v));
//!
//! // Advance virtual time to trigger the emissions
//! TestScheduler::advance_by(Duration::from_millis(30));
//! assert_eq!(*ticks.lock(), vec![0, 1, 2]);
//! ```
//!
//! # Thread Safety
//!
//! TestScheduler uses thread-local storage, so each thread has its own
//! independent virtual time and task queue. This keeps tests isolated when
//! the test harness runs them in parallel.

use std::{cell::RefCell, cmp::Ordering, collections::BinaryHeap};

use super::{Duration, Scheduler, Task, TaskHandle};
use crate::subscription::Subscription;

// ==================== Internal State ====================

#[derive(Default)]
struct TestSchedulerState {
  virtual_time: Duration,
  task_queue: BinaryHeap<ScheduledTask>,
  next_task_id: usize,
  initialized: bool,
}

struct ScheduledTask {
  scheduled_time: Duration,
  task_id: usize,
  task: Task,
  handle: TaskHandle,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool {
    self.scheduled_time == other.scheduled_time && self.task_id == other.task_id
  }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by task_id
    other
      .scheduled_time
      .cmp(&self.scheduled_time)
      .then_with(|| other.task_id.cmp(&self.task_id))
  }
}

thread_local! {
  static TEST_SCHEDULER_STATE: RefCell<TestSchedulerState>
    = RefCell::new(TestSchedulerState::default());
}

// ==================== TestScheduler ====================

/// A virtual time scheduler for deterministic testing.
///
/// This is a zero-sized type that accesses thread-local state.
/// All instances in the same thread share the same virtual time and task queue.
#[derive(Clone, Copy, Default)]
pub struct TestScheduler;

impl TestScheduler {
  /// Initialize or reset the test scheduler state.
  ///
  /// Resets the virtual time to zero, clears the task queue, and resets the
  /// task ID counter.
  ///
  /// # Panics
  ///
  /// Other methods will panic if `init()` has not been called first.
  pub fn init() {
    TEST_SCHEDULER_STATE.with(|state| {
      let mut state = state.borrow_mut();
      state.virtual_time = Duration::ZERO;
      state.task_queue.clear();
      state.next_task_id = 0;
      state.initialized = true;
    });
  }

  fn ensure_initialized() {
    TEST_SCHEDULER_STATE.with(|state| {
      assert!(
        state.borrow().initialized,
        "TestScheduler::init() must be called before using the scheduler"
      );
    });
  }

  /// Get the current virtual time.
  pub fn now() -> Duration {
    Self::ensure_initialized();
    TEST_SCHEDULER_STATE.with(|state| state.borrow().virtual_time)
  }

  /// Get the number of pending tasks in the queue, cancelled ones included.
  pub fn pending_count() -> usize {
    Self::ensure_initialized();
    TEST_SCHEDULER_STATE.with(|state| state.borrow().task_queue.len())
  }

  fn execute_tasks_until(target_time: Option<Duration>) {
    loop {
      let task = TEST_SCHEDULER_STATE.with(|state| {
        let mut state = state.borrow_mut();
        let due = state
          .task_queue
          .peek()
          .is_some_and(|peek| target_time.map_or(true, |limit| peek.scheduled_time <= limit));
        if !due {
          return None;
        }
        let scheduled_task = state.task_queue.pop()?;
        state.virtual_time = scheduled_task.scheduled_time;
        Some(scheduled_task)
      });

      let Some(scheduled_task) = task else {
        break;
      };

      // The state borrow is released here: tasks may schedule follow-ups.
      if !scheduled_task.handle.is_closed() {
        (scheduled_task.task)();
        scheduled_task.handle.mark_finished();
      }
    }
  }

  /// Advance virtual time by the specified duration and execute due tasks.
  ///
  /// Tasks are executed in order of their scheduled time, with FIFO ordering
  /// for tasks scheduled at the same time.
  pub fn advance_by(duration: Duration) {
    Self::ensure_initialized();
    let target_time = TEST_SCHEDULER_STATE.with(|state| state.borrow().virtual_time + duration);

    Self::execute_tasks_until(Some(target_time));

    TEST_SCHEDULER_STATE.with(|state| {
      state.borrow_mut().virtual_time = target_time;
    });
  }

  /// Execute all pending tasks by advancing time to each task's scheduled time.
  ///
  /// Never returns while a task keeps rescheduling itself (an uncancelled
  /// `interval`, say).
  pub fn flush() {
    Self::ensure_initialized();
    Self::execute_tasks_until(None);
  }
}

impl Scheduler for TestScheduler {
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    TestScheduler::ensure_initialized();
    TEST_SCHEDULER_STATE.with(|state| {
      let mut state = state.borrow_mut();
      let scheduled_time = state.virtual_time + delay.unwrap_or(Duration::ZERO);
      let handle = TaskHandle::new();
      let task_id = state.next_task_id;
      state.next_task_id += 1;
      state.task_queue.push(ScheduledTask {
        scheduled_time,
        task_id,
        task,
        handle: handle.clone(),
      });
      handle
    })
  }

  fn now(&self) -> Duration { TestScheduler::now() }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use super::*;

  #[test]
  fn runs_tasks_in_time_order() {
    TestScheduler::init();
    let order = Arc::new(Mutex::new(vec![]));
    for (name, delay) in [("b", 20), ("a", 10), ("c", 20)] {
      let order = order.clone();
      TestScheduler.schedule(
        Box::new(move || order.lock().push(name)),
        Some(Duration::from_millis(delay)),
      );
    }
    assert_eq!(TestScheduler::pending_count(), 3);

    TestScheduler::advance_by(Duration::from_millis(10));
    assert_eq!(*order.lock(), vec!["a"]);
    assert_eq!(TestScheduler::now(), Duration::from_millis(10));

    TestScheduler::flush();
    assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    assert_eq!(TestScheduler::pending_count(), 0);
  }

  #[test]
  fn cancelled_task_is_skipped() {
    TestScheduler::init();
    let hit = Arc::new(Mutex::new(false));
    let c_hit = hit.clone();
    let handle = TestScheduler.schedule(
      Box::new(move || *c_hit.lock() = true),
      Some(Duration::from_millis(5)),
    );
    handle.clone().unsubscribe();
    TestScheduler::flush();
    assert!(!*hit.lock());
    assert!(handle.is_closed());
  }

  #[test]
  fn stopwatch_reads_virtual_time() {
    TestScheduler::init();
    let watch = TestScheduler.stopwatch();
    TestScheduler::advance_by(Duration::from_millis(42));
    assert_eq!(watch.elapsed(), Duration::from_millis(42));
  }

  #[test]
  fn tasks_can_schedule_follow_ups() {
    TestScheduler::init();
    let hits = Arc::new(Mutex::new(0));
    let c_hits = hits.clone();
    TestScheduler.schedule(
      Box::new(move || {
        *c_hits.lock() += 1;
        let c_hits = c_hits.clone();
        TestScheduler.schedule(Box::new(move || *c_hits.lock() += 1), Some(Duration::from_millis(1)));
      }),
      None,
    );
    TestScheduler::flush();
    assert_eq!(*hits.lock(), 2);
  }
}
