//! Blocking iterators over a push sequence.
//!
//! [`latest`](crate::observable::Observable::latest) and
//! [`next_values`](crate::observable::Observable::next_values) turn an
//! observable into an [`Iterator`] of `Result<Item, Err>`. The producer side
//! releases a counting [`Semaphore`] once per notification the consumer
//! should see; the consumer blocks on it inside `Iterator::next`. An upstream
//! error is returned as `Some(Err(err))`, after which the iterator is
//! exhausted. Dropping the iterator disposes the upstream subscription.
//!
//! These are meant for sources that produce on other threads: subscribing to
//! an endless synchronous source never returns.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use parking_lot::{Condvar, Mutex};

use crate::{
  observable::CoreObservable,
  observer::Observer,
  subscription::{SingleAssignmentSubscription, Subscription},
};

/// A counting semaphore: every `release` lets exactly one `acquire` through,
/// no matter which comes first.
#[derive(Default)]
pub struct Semaphore {
  permits: Mutex<usize>,
  available: Condvar,
}

impl Semaphore {
  pub fn release(&self) {
    *self.permits.lock() += 1;
    self.available.notify_one();
  }

  pub fn acquire(&self) {
    let mut permits = self.permits.lock();
    while *permits == 0 {
      self.available.wait(&mut permits);
    }
    *permits -= 1;
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PullMode {
  /// Each pull returns the newest value not returned yet; values overwritten
  /// before a pull are skipped.
  Latest,
  /// Each pull waits for the next value produced after the pull started;
  /// values produced while nobody waits are dropped.
  Next,
}

enum Terminal<Err> {
  Error(Err),
  Completed,
}

struct PullState<Item, Err> {
  value: Option<Item>,
  terminal: Option<Terminal<Err>>,
  /// `Latest`: a released permit has not been consumed yet.
  available: bool,
  /// `Next`: a consumer is blocked waiting for a value.
  waiting: bool,
}

struct PullShared<Item, Err> {
  mode: PullMode,
  state: Mutex<PullState<Item, Err>>,
  semaphore: Semaphore,
  closed: AtomicBool,
}

impl<Item, Err> PullShared<Item, Err> {
  fn push(&self, value: Option<Item>, terminal: Option<Terminal<Err>>) {
    let mut state = self.state.lock();
    if state.terminal.is_some() {
      return;
    }
    let release = match self.mode {
      PullMode::Latest => {
        if value.is_some() {
          state.value = value;
        }
        state.terminal = terminal;
        !std::mem::replace(&mut state.available, true)
      }
      PullMode::Next => {
        let is_value = value.is_some();
        if is_value && !state.waiting {
          return;
        }
        if is_value {
          state.value = value;
        }
        state.terminal = terminal;
        std::mem::replace(&mut state.waiting, false)
      }
    };
    drop(state);
    if release {
      self.semaphore.release();
    }
  }
}

/// The observer feeding a [`BlockingIter`].
pub struct PullObserver<Item, Err> {
  shared: Arc<PullShared<Item, Err>>,
}

impl<Item, Err> Observer<Item, Err> for PullObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.shared.push(Some(value), None) }

  fn error(self, err: Err) { self.shared.push(None, Some(Terminal::Error(err))) }

  fn complete(self) { self.shared.push(None, Some(Terminal::Completed)) }

  fn is_closed(&self) -> bool { self.shared.closed.load(Ordering::Acquire) }
}

/// Blocking iterator returned by `latest` and `next_values`.
pub struct BlockingIter<Item, Err> {
  shared: Arc<PullShared<Item, Err>>,
  upstream: SingleAssignmentSubscription,
  done: bool,
}

impl<Item, Err> BlockingIter<Item, Err> {
  pub(crate) fn subscribe<S>(source: S, mode: PullMode) -> Self
  where
    S: CoreObservable<PullObserver<Item, Err>>,
    S::Unsub: Send + 'static,
  {
    let shared = Arc::new(PullShared {
      mode,
      state: Mutex::new(PullState { value: None, terminal: None, available: false, waiting: false }),
      semaphore: Semaphore::default(),
      closed: AtomicBool::new(false),
    });
    let upstream = SingleAssignmentSubscription::new();
    upstream.assign(source.actual_subscribe(PullObserver { shared: shared.clone() }));
    BlockingIter { shared, upstream, done: false }
  }

  fn wait(&self) {
    match self.shared.mode {
      PullMode::Latest => self.shared.semaphore.acquire(),
      PullMode::Next => {
        let mut state = self.shared.state.lock();
        if state.terminal.is_some() {
          return;
        }
        state.waiting = true;
        drop(state);
        self.shared.semaphore.acquire();
      }
    }
  }
}

impl<Item, Err> Iterator for BlockingIter<Item, Err> {
  type Item = Result<Item, Err>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }
    self.wait();
    let mut state = self.shared.state.lock();
    state.available = false;
    if let Some(value) = state.value.take() {
      if self.shared.mode == PullMode::Latest && state.terminal.is_some() {
        // The terminal arrived behind this value; leave a permit for it.
        state.available = true;
        self.shared.semaphore.release();
      }
      return Some(Ok(value));
    }
    self.done = true;
    match state.terminal.take() {
      Some(Terminal::Error(err)) => Some(Err(err)),
      Some(Terminal::Completed) | None => None,
    }
  }
}

impl<Item, Err> Drop for BlockingIter<Item, Err> {
  fn drop(&mut self) {
    self.shared.closed.store(true, Ordering::Release);
    self.upstream.clone().unsubscribe();
  }
}
