//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of data in the reactive pattern.
//! It provides three methods: next (for values), error (for errors), and
//! complete (for stream completion).
//!
//! The grammar every observer relies on is `next* (error | complete)?`:
//! notifications are serialized, and at most one terminal event arrives.
//! Terminal methods consume the observer, so the type system already rules
//! out events after a terminal on any single observer value; operators that
//! share an observer between producers keep it in a [`Sink`](crate::sink::Sink).

use std::{
  convert::Infallible,
  panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
};

use tracing::warn;

use crate::subscription::{SingleAssignmentSubscription, Subscription};

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: The consumer of data in reactive programming
pub trait Observer<Item, Err> {
  /// Receive the next value from the observable
  fn next(&mut self, value: Item);

  /// Handle an error from the observable
  ///
  /// This consumes the observer, as no more values can be emitted after an
  /// error
  fn error(self, err: Err);

  /// Handle completion of the observable
  ///
  /// This consumes the observer, as no more values can be emitted after
  /// completion
  fn complete(self);

  /// Checks if the observer is closed.
  ///
  /// Sources (like `from_iter`) poll this to stop emitting early once a
  /// downstream operator such as `take` has finished.
  fn is_closed(&self) -> bool;
}

// ============================================================================
// Emitter Trait
// ============================================================================

/// A trait for emitting items to an Observer via mutable reference.
///
/// Unlike `Observer`, which consumes `self` for `error` and `complete`,
/// `Emitter` takes `&mut self` for all methods so the closure given to
/// `create` can receive a `&mut dyn Emitter` without knowing the concrete
/// observer type downstream. Events after a terminal are dropped.
pub trait Emitter<Item, Err> {
  fn next(&mut self, value: Item);
  fn error(&mut self, err: Err);
  fn complete(&mut self);
  fn is_closed(&self) -> bool;
}

// ============================================================================
// DynObserver Trait - Object-safe Observer
// ============================================================================

/// Helper trait to enable object-safe Observers (Box<dyn Observer>)
///
/// Standard Observer trait is not object-safe because methods take `self` by
/// value. DynObserver mirrors the interface but adapts it for vtables.
pub trait DynObserver<Item, Err> {
  fn box_next(&mut self, value: Item);
  fn box_error(self: Box<Self>, err: Err);
  fn box_complete(self: Box<Self>);
  fn box_is_closed(&self) -> bool;
}

impl<T, Item, Err> DynObserver<Item, Err> for T
where
  T: Observer<Item, Err>,
{
  fn box_next(&mut self, value: Item) { self.next(value); }
  fn box_error(self: Box<Self>, err: Err) { self.error(err); }
  fn box_complete(self: Box<Self>) { self.complete(); }
  fn box_is_closed(&self) -> bool { self.is_closed() }
}

/// Boxed, thread-safe observer.
pub type BoxedObserver<Item, Err> = Box<dyn DynObserver<Item, Err> + Send>;

impl<Item, Err> Observer<Item, Err> for BoxedObserver<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { (**self).box_next(value) }

  #[inline]
  fn error(self, err: Err) { self.box_error(err) }

  #[inline]
  fn complete(self) { self.box_complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).box_is_closed() }
}

// ============================================================================
// Closure adapters
// ============================================================================

/// Closure adapter behind `subscribe(|v| ...)`.
///
/// Only sequences that cannot fail are accepted: the `Infallible` error type
/// makes forgetting an error handler a compile error rather than a silently
/// dropped failure.
#[derive(Clone)]
pub struct FnMutObserver<F>(pub F);

impl<F, Item> Observer<Item, Infallible> for FnMutObserver<F>
where
  F: FnMut(Item),
{
  #[inline]
  fn next(&mut self, v: Item) { (self.0)(v); }

  #[inline]
  fn error(self, err: Infallible) { match err {} }

  #[inline]
  fn complete(self) {}

  #[inline]
  fn is_closed(&self) -> bool { false }
}

/// Closure adapter with a handler for every event, behind `subscribe_all`.
pub struct ObserverAll<N, E, C> {
  pub next: N,
  pub error: E,
  pub complete: C,
}

impl<N, E, C, Item, Err> Observer<Item, Err> for ObserverAll<N, E, C>
where
  N: FnMut(Item),
  E: FnOnce(Err),
  C: FnOnce(),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  #[inline]
  fn error(self, err: Err) { (self.error)(err) }

  #[inline]
  fn complete(self) { (self.complete)() }

  #[inline]
  fn is_closed(&self) -> bool { false }
}

/// Option observer - None ignores all events, Some delegates to inner
impl<O, Item, Err> Observer<Item, Err> for Option<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(inner) = self {
      inner.next(value);
    }
  }

  fn error(self, err: Err) {
    if let Some(inner) = self {
      inner.error(err);
    }
  }

  fn complete(self) {
    if let Some(inner) = self {
      inner.complete();
    }
  }

  fn is_closed(&self) -> bool { self.as_ref().map_or(true, Observer::is_closed) }
}

// ============================================================================
// SafeObserver
// ============================================================================

/// Wraps an untrusted observer at a public subscribe boundary.
///
/// A panic raised by the wrapped observer disposes the upstream subscription
/// and closes the wrapper before the panic continues to unwind, so the
/// producer never observes a half-torn-down subscription and never delivers
/// again. After a terminal the upstream is disposed as well.
///
/// The panic is not swallowed: it keeps unwinding through every operator
/// between the producer and this wrapper. Operator gates are `parking_lot`
/// locks, which do not poison, and the trampolines in `merge_all` and the
/// fallback family clear their loop flags while unwinding.
pub struct SafeObserver<O> {
  observer: O,
  upstream: SingleAssignmentSubscription,
  closed: bool,
}

impl<O> SafeObserver<O> {
  pub fn new(observer: O, upstream: SingleAssignmentSubscription) -> Self {
    SafeObserver { observer, upstream, closed: false }
  }
}

impl<O, Item, Err> Observer<Item, Err> for SafeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.closed {
      return;
    }
    let observer = &mut self.observer;
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| observer.next(value))) {
      self.closed = true;
      warn!("observer panicked in next; disposing upstream");
      self.upstream.clone().unsubscribe();
      resume_unwind(payload);
    }
  }

  fn error(self, err: Err) {
    if self.closed {
      return;
    }
    let SafeObserver { observer, upstream, .. } = self;
    let res = catch_unwind(AssertUnwindSafe(move || observer.error(err)));
    upstream.unsubscribe();
    if let Err(payload) = res {
      warn!("observer panicked in error");
      resume_unwind(payload);
    }
  }

  fn complete(self) {
    if self.closed {
      return;
    }
    let SafeObserver { observer, upstream, .. } = self;
    let res = catch_unwind(AssertUnwindSafe(move || observer.complete()));
    upstream.unsubscribe();
    if let Err(payload) = res {
      warn!("observer panicked in complete");
      resume_unwind(payload);
    }
  }

  fn is_closed(&self) -> bool { self.closed || self.observer.is_closed() }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use super::*;

  struct TestObserver {
    values: Vec<i32>,
  }

  impl Observer<i32, ()> for TestObserver {
    fn next(&mut self, value: i32) { self.values.push(value); }

    fn error(self, _: ()) {}

    fn complete(self) {}

    fn is_closed(&self) -> bool { false }
  }

  #[test]
  fn observer_trait() {
    let mut obs = TestObserver { values: vec![] };
    obs.next(1);
    obs.next(2);
    assert_eq!(obs.values, vec![1, 2]);
    assert!(!obs.is_closed());
  }

  #[test]
  fn closure_as_observer() {
    let mut count = 0;
    let mut closure_obs = FnMutObserver(|v: i32| {
      count += v;
    });

    closure_obs.next(10);
    closure_obs.next(20);
    assert_eq!(count, 30);
  }

  #[test]
  fn none_observer_is_closed() {
    let none: Option<TestObserver> = None;
    assert!(Observer::<i32, ()>::is_closed(&none));
  }

  #[test]
  fn safe_observer_disposes_upstream_on_panic() {
    let upstream = SingleAssignmentSubscription::new();
    let mut safe = SafeObserver::new(
      FnMutObserver(|v: i32| {
        if v == 2 {
          panic!("boom");
        }
      }),
      upstream.clone(),
    );
    safe.next(1);
    let res = catch_unwind(AssertUnwindSafe(|| safe.next(2)));
    assert!(res.is_err());
    assert!(upstream.is_closed());
    assert!(Observer::<i32, Infallible>::is_closed(&safe));
  }
}
