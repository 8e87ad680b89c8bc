//! The shared downstream slot of multi-producer operators.
//!
//! An operator fed by several producers (the inner sequences of a merge, the
//! sources of a combine_latest, a timer racing its upstream) funnels every
//! notification through one [`Sink`]. The sink owns:
//!
//! - the *gate*, a mutex around the downstream observer and the operator's
//!   mutable state, so notifications reach downstream one at a time;
//! - a [`SinkHandle`]: an atomic `disposed` flag plus the composite of
//!   upstream subscriptions. Disposing through the handle never touches the
//!   gate, so it cannot deadlock against a producer that is mid-emission.
//!
//! Terminal events take the observer out of the gate and deliver it outside
//! the lock. Whichever producer takes it first wins; later events find the
//! slot empty and are dropped.
//!
//! Operators never subscribe to a new source while holding the gate: a
//! source that emits synchronously would re-enter the same gate.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use parking_lot::{Mutex, MutexGuard};
use tracing::trace;

use crate::{
  observer::Observer,
  subscription::{CompositeSubscription, EntryId, Subscription},
};

/// Cancellation side of a sink: what `actual_subscribe` hands back.
#[derive(Clone, Default)]
pub struct SinkHandle {
  disposed: Arc<AtomicBool>,
  upstream: CompositeSubscription,
}

impl SinkHandle {
  /// The composite holding every upstream resource of the operator.
  pub fn upstream(&self) -> &CompositeSubscription { &self.upstream }

  /// Register an upstream resource. If the sink is already disposed the
  /// resource is disposed on arrival.
  pub fn install(&self, subscription: impl Subscription + Send + 'static) -> Option<EntryId> {
    self.upstream.add(subscription)
  }
}

impl Subscription for SinkHandle {
  fn unsubscribe(self) {
    self.disposed.store(true, Ordering::Release);
    self.upstream.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.disposed.load(Ordering::Acquire) }
}

/// Everything behind the gate: the downstream observer and operator state.
pub struct SinkGate<O, S> {
  observer: Option<O>,
  disposed: Arc<AtomicBool>,
  pub state: S,
}

impl<O, S> SinkGate<O, S> {
  /// Forward a value unless the sink has terminated or been disposed.
  pub fn next<Item, Err>(&mut self, value: Item)
  where
    O: Observer<Item, Err>,
  {
    if self.disposed.load(Ordering::Acquire) {
      return;
    }
    if let Some(observer) = self.observer.as_mut() {
      observer.next(value);
    }
  }

  /// True once a terminal was delivered or the sink was disposed.
  pub fn is_stopped(&self) -> bool {
    self.observer.is_none() || self.disposed.load(Ordering::Acquire)
  }

  /// Claim the right to deliver the terminal event. Returns `None` if
  /// another producer got there first or the sink was disposed. The caller
  /// delivers the terminal after releasing the gate and then disposes the
  /// sink.
  pub fn take_observer(&mut self) -> Option<O> {
    let was_disposed = self.disposed.swap(true, Ordering::AcqRel);
    let observer = self.observer.take();
    if was_disposed { None } else { observer }
  }
}

/// The gate plus the handle, shared by all producers of one subscription.
pub struct Sink<O, S = ()> {
  gate: Arc<Mutex<SinkGate<O, S>>>,
  handle: SinkHandle,
}

impl<O, S> Clone for Sink<O, S> {
  fn clone(&self) -> Self { Sink { gate: self.gate.clone(), handle: self.handle.clone() } }
}

impl<O, S> Sink<O, S> {
  pub fn new(observer: O, state: S) -> Self {
    let handle = SinkHandle::default();
    let gate = SinkGate { observer: Some(observer), disposed: handle.disposed.clone(), state };
    Sink { gate: Arc::new(Mutex::new(gate)), handle }
  }

  pub fn handle(&self) -> &SinkHandle { &self.handle }

  pub fn upstream(&self) -> &CompositeSubscription { &self.handle.upstream }

  /// Enter the gate.
  pub fn lock(&self) -> MutexGuard<'_, SinkGate<O, S>> { self.gate.lock() }

  /// Lock-free check used by `Observer::is_closed` of producer-side
  /// observers.
  pub fn is_disposed(&self) -> bool { self.handle.is_closed() }

  /// Forward one value through the gate.
  pub fn next<Item, Err>(&self, value: Item)
  where
    O: Observer<Item, Err>,
  {
    self.lock().next(value)
  }

  /// Deliver `err` if no terminal has been delivered yet, then dispose.
  pub fn error<Item, Err>(&self, err: Err)
  where
    O: Observer<Item, Err>,
  {
    let observer = self.lock().take_observer();
    match observer {
      Some(observer) => observer.error(err),
      None => trace!("sink already stopped; error dropped"),
    }
    self.dispose();
  }

  /// Deliver completion if no terminal has been delivered yet, then dispose.
  pub fn complete<Item, Err>(&self)
  where
    O: Observer<Item, Err>,
  {
    let observer = self.lock().take_observer();
    if let Some(observer) = observer {
      observer.complete();
    }
    self.dispose();
  }

  /// Dispose every upstream resource. Idempotent; never takes the gate.
  pub fn dispose(&self) { self.handle.clone().unsubscribe() }
}
