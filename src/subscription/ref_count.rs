use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use parking_lot::Mutex;

use super::{BoxedSubscription, Subscription};

/// Shares one underlying resource between a primary owner and any number of
/// borrowers.
///
/// The underlying resource is released only after the primary handle has
/// been disposed *and* every [`RefCountGuard`] handed out by
/// [`guard`](RefCountSubscription::guard) has been released. `group_by` uses
/// it to keep the source connected while grouped observables are still
/// subscribed, even after the outer subscription is gone.
#[derive(Clone)]
pub struct RefCountSubscription(Arc<Mutex<RefCountState>>);

struct RefCountState {
  underlying: Option<BoxedSubscription>,
  count: usize,
  primary_disposed: bool,
}

impl RefCountSubscription {
  pub fn new(underlying: impl Subscription + Send + 'static) -> Self {
    RefCountSubscription(Arc::new(Mutex::new(RefCountState {
      underlying: Some(BoxedSubscription::new(underlying)),
      count: 0,
      primary_disposed: false,
    })))
  }

  /// Borrow the underlying resource. If it is already released, the
  /// returned guard is closed from the start.
  pub fn guard(&self) -> RefCountGuard {
    let mut state = self.0.lock();
    if state.underlying.is_none() {
      return RefCountGuard { parent: self.0.clone(), released: Arc::new(AtomicBool::new(true)) };
    }
    state.count += 1;
    RefCountGuard { parent: self.0.clone(), released: Arc::new(AtomicBool::new(false)) }
  }

  /// Number of outstanding guards.
  pub fn count(&self) -> usize { self.0.lock().count }

  pub fn is_primary_disposed(&self) -> bool { self.0.lock().primary_disposed }
}

impl Subscription for RefCountSubscription {
  fn unsubscribe(self) {
    let mut state = self.0.lock();
    if state.primary_disposed {
      return;
    }
    state.primary_disposed = true;
    let released = if state.count == 0 { state.underlying.take() } else { None };
    drop(state);
    if let Some(underlying) = released {
      underlying.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.0.lock().underlying.is_none() }
}

/// A borrow token of a [`RefCountSubscription`]. Releasing it is idempotent
/// across clones.
#[derive(Clone)]
pub struct RefCountGuard {
  parent: Arc<Mutex<RefCountState>>,
  released: Arc<AtomicBool>,
}

impl Subscription for RefCountGuard {
  fn unsubscribe(self) {
    if self.released.swap(true, Ordering::AcqRel) {
      return;
    }
    let mut state = self.parent.lock();
    state.count -= 1;
    let released = if state.count == 0 && state.primary_disposed {
      state.underlying.take()
    } else {
      None
    };
    drop(state);
    if let Some(underlying) = released {
      underlying.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.released.load(Ordering::Acquire) }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::subscription::test::CountingSubscription;

  #[test]
  fn released_when_primary_disposed_without_guards() {
    let inner = CountingSubscription::default();
    let rc = RefCountSubscription::new(inner.clone());
    rc.clone().unsubscribe();
    assert_eq!(inner.disposed(), 1);
    assert!(rc.is_closed());
  }

  #[test]
  fn guards_keep_resource_alive() {
    let inner = CountingSubscription::default();
    let rc = RefCountSubscription::new(inner.clone());
    let g1 = rc.guard();
    let g2 = rc.guard();
    assert_eq!(rc.count(), 2);

    rc.clone().unsubscribe();
    assert!(rc.is_primary_disposed());
    assert_eq!(inner.disposed(), 0);

    g1.clone().unsubscribe();
    g1.unsubscribe();
    assert_eq!(rc.count(), 1);
    assert_eq!(inner.disposed(), 0);

    g2.unsubscribe();
    assert_eq!(inner.disposed(), 1);
  }

  #[test]
  fn guard_after_release_is_closed() {
    let rc = RefCountSubscription::new(());
    rc.clone().unsubscribe();
    let late = rc.guard();
    assert!(late.is_closed());
    late.unsubscribe();
    assert_eq!(rc.count(), 0);
  }

  #[test]
  fn guard_release_before_primary_does_not_dispose() {
    let inner = CountingSubscription::default();
    let rc = RefCountSubscription::new(inner.clone());
    rc.guard().unsubscribe();
    assert_eq!(inner.disposed(), 0);
    rc.unsubscribe();
    assert_eq!(inner.disposed(), 1);
  }

  #[test]
  fn racing_guard_and_primary_release_once() {
    for _ in 0..100 {
      let inner = CountingSubscription::default();
      let rc = RefCountSubscription::new(inner.clone());
      let guards: Vec<_> = (0..3).map(|_| rc.guard()).collect();
      let mut workers: Vec<_> = guards
        .into_iter()
        .flat_map(|guard| [guard.clone(), guard])
        .map(|guard| std::thread::spawn(move || guard.unsubscribe()))
        .collect();
      let primary = rc.clone();
      workers.push(std::thread::spawn(move || primary.unsubscribe()));
      workers.into_iter().for_each(|w| w.join().unwrap());
      assert_eq!(inner.disposed(), 1);
      assert_eq!(rc.count(), 0);
      assert!(rc.is_closed());
    }
  }
}
