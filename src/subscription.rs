//! Subscription handles and the four resource-lifetime primitives every
//! operator is assembled from.
//!
//! | Primitive | Holds | Disposal |
//! |-----------|-------|----------|
//! | [`SingleAssignmentSubscription`] | at most one resource, set once | assigning after disposal disposes the newcomer |
//! | [`SerialSubscription`] | one replaceable resource | replacing disposes the previous one |
//! | [`CompositeSubscription`] | a dynamic set | removing an entry disposes it |
//! | [`RefCountSubscription`] | one shared resource | released once primary and all guards are gone |
//!
//! All of them are cheap to clone handles over shared state, idempotent on
//! `unsubscribe`, and safe to dispose concurrently from several threads.

mod boxed;
mod composite;
mod ref_count;
mod serial;
mod single_assignment;

pub use boxed::*;
pub use composite::*;
pub use ref_count::*;
pub use serial::*;
pub use single_assignment::*;

/// Handle returned by `actual_subscribe` to cancel an active subscription.
///
/// `unsubscribe` consumes the handle; clonable handles share their state so
/// unsubscribing any clone closes all of them.
pub trait Subscription {
  fn unsubscribe(self);

  fn is_closed(&self) -> bool;
}

/// The subscription of a source that finished synchronously.
impl Subscription for () {
  #[inline]
  fn unsubscribe(self) {}

  #[inline]
  fn is_closed(&self) -> bool { true }
}

impl<T: Subscription> Subscription for Option<T> {
  #[inline]
  fn unsubscribe(self) {
    if let Some(inner) = self {
      inner.unsubscribe()
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.as_ref().map_or(true, |s| s.is_closed()) }
}

impl<A: Subscription, B: Subscription> Subscription for (A, B) {
  fn unsubscribe(self) {
    self.0.unsubscribe();
    self.1.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.0.is_closed() && self.1.is_closed() }
}

/// Runs a closure on unsubscribe; the teardown of a `create` source.
pub struct ClosureSubscription<F: FnOnce()>(pub F);

impl<F: FnOnce()> Subscription for ClosureSubscription<F> {
  #[inline]
  fn unsubscribe(self) { (self.0)() }

  #[inline]
  fn is_closed(&self) -> bool { false }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[must_use]
pub struct SubscriptionGuard<T: Subscription>(Option<T>);

impl<T: Subscription> SubscriptionGuard<T> {
  pub fn new(subscription: T) -> Self { SubscriptionGuard(Some(subscription)) }

  /// Give up the RAII behaviour and hand back the subscription.
  pub fn into_inner(mut self) -> Option<T> { self.0.take() }
}

impl<T: Subscription> Drop for SubscriptionGuard<T> {
  fn drop(&mut self) {
    if let Some(subscription) = self.0.take() {
      subscription.unsubscribe();
    }
  }
}

/// Extension to turn any subscription into a [`SubscriptionGuard`].
pub trait SubscriptionExt: Subscription + Sized {
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately.
  fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self> { SubscriptionGuard::new(self) }
}

impl<T: Subscription> SubscriptionExt for T {}

#[cfg(test)]
pub(crate) mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;

  /// Counts how many times it was disposed.
  #[derive(Clone, Default)]
  pub(crate) struct CountingSubscription(pub(crate) Arc<AtomicUsize>);

  impl CountingSubscription {
    pub(crate) fn disposed(&self) -> usize { self.0.load(Ordering::SeqCst) }
  }

  impl Subscription for CountingSubscription {
    fn unsubscribe(self) { self.0.fetch_add(1, Ordering::SeqCst); }

    fn is_closed(&self) -> bool { self.disposed() > 0 }
  }

  #[test]
  fn tuple_unsubscribes_both() {
    let a = CountingSubscription::default();
    let b = CountingSubscription::default();
    let pair = (a.clone(), b.clone());
    assert!(!pair.is_closed());
    pair.unsubscribe();
    assert_eq!(a.disposed(), 1);
    assert_eq!(b.disposed(), 1);
  }

  #[test]
  fn guard_unsubscribes_on_drop() {
    let a = CountingSubscription::default();
    {
      let _guard = a.clone().unsubscribe_when_dropped();
    }
    assert_eq!(a.disposed(), 1);

    let kept = a.clone().unsubscribe_when_dropped().into_inner();
    assert!(kept.is_some());
    assert_eq!(a.disposed(), 1);
  }
}
