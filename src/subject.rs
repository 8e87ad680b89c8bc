//! A hot, multicasting observable that is also an observer.
//!
//! Observers are kept in a registration list behind a mutex. Emission takes a
//! snapshot of the list and calls every observer *outside* the subject lock,
//! each behind its own per-observer lock, so an observer may subscribe to or
//! unsubscribe from the same subject while handling a value.
//!
//! After a terminal event the list is cleared; late subscribers receive the
//! same terminal immediately.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc, Weak,
};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::{BoxedObserver, Observer},
  subscription::Subscription,
};

/// One registered observer. `closed` is set by unsubscribe without taking
/// the observer lock, which may be held by an emission on this very stack.
struct Slot<Item, Err> {
  closed: AtomicBool,
  observer: Mutex<Option<BoxedObserver<Item, Err>>>,
}

type ObserverSlot<Item, Err> = Arc<Slot<Item, Err>>;

impl<Item, Err> Slot<Item, Err> {
  fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }

  fn take(&self) -> Option<BoxedObserver<Item, Err>> {
    if self.closed.swap(true, Ordering::AcqRel) {
      return None;
    }
    self.observer.lock().take()
  }
}

#[derive(Clone)]
enum Terminal<Err> {
  Error(Err),
  Completed,
}

struct SubjectState<Item, Err> {
  observers: SmallVec<[(usize, ObserverSlot<Item, Err>); 2]>,
  next_id: usize,
  terminal: Option<Terminal<Err>>,
}

impl<Item, Err> Default for SubjectState<Item, Err> {
  fn default() -> Self { SubjectState { observers: SmallVec::new(), next_id: 0, terminal: None } }
}

/// A multicasting source of `Item`s, fed through its [`Observer`] methods.
///
/// ```
/// use rxcore::prelude::*;
///
/// let mut subject = Subject::<i32, std::convert::Infallible>::default();
/// subject.clone().subscribe(|v| println!("a: {v}"));
/// subject.clone().subscribe(|v| println!("b: {v}"));
/// subject.next(1);
/// ```
pub struct Subject<Item, Err> {
  inner: Arc<Mutex<SubjectState<Item, Err>>>,
}

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self { Subject { inner: self.inner.clone() } }
}

impl<Item, Err> Default for Subject<Item, Err> {
  fn default() -> Self { Subject { inner: Arc::new(Mutex::new(SubjectState::default())) } }
}

impl<Item, Err> Subject<Item, Err> {
  pub fn new() -> Self { Self::default() }

  /// Number of currently registered observers.
  pub fn observer_count(&self) -> usize { self.inner.lock().observers.len() }

  /// True when both handles refer to the same subject.
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.inner, &other.inner) }

  fn snapshot(&self) -> Option<SmallVec<[ObserverSlot<Item, Err>; 2]>> {
    let state = self.inner.lock();
    if state.terminal.is_some() {
      return None;
    }
    Some(state.observers.iter().map(|(_, o)| o.clone()).collect())
  }

  fn terminate(&self, terminal: Terminal<Err>) -> SmallVec<[ObserverSlot<Item, Err>; 2]>
  where
    Err: Clone,
  {
    let mut state = self.inner.lock();
    if state.terminal.is_some() {
      return SmallVec::new();
    }
    state.terminal = Some(terminal);
    state.observers.drain(..).map(|(_, o)| o).collect()
  }
}

impl<Item, Err> ObservableType for Subject<Item, Err> {
  type Item = Item;
  type Err = Err;
}

impl<Item, Err> Observer<Item, Err> for Subject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    let Some(observers) = self.snapshot() else {
      return;
    };
    for slot in observers {
      if slot.is_closed() {
        continue;
      }
      let mut observer = slot.observer.lock();
      if let Some(o) = observer.as_mut() {
        o.next(value.clone());
      }
      if slot.is_closed() {
        observer.take();
      }
    }
  }

  fn error(self, err: Err) {
    for slot in self.terminate(Terminal::Error(err.clone())) {
      if let Some(observer) = slot.take() {
        observer.error(err.clone());
      }
    }
  }

  fn complete(self) {
    for slot in self.terminate(Terminal::Completed) {
      if let Some(observer) = slot.take() {
        observer.complete();
      }
    }
  }

  fn is_closed(&self) -> bool { self.inner.lock().terminal.is_some() }
}

impl<Item, Err, O> CoreObservable<O> for Subject<Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: 'static,
  Err: Clone + 'static,
{
  type Unsub = SubjectSubscription<Item, Err>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let mut state = self.inner.lock();
    if let Some(terminal) = state.terminal.clone() {
      drop(state);
      match terminal {
        Terminal::Error(err) => observer.error(err),
        Terminal::Completed => observer.complete(),
      }
      let slot = Slot { closed: AtomicBool::new(true), observer: Mutex::new(None) };
      return SubjectSubscription { subject: Weak::new(), id: 0, slot: Arc::new(slot) };
    }
    let id = state.next_id;
    state.next_id += 1;
    let slot = Arc::new(Slot {
      closed: AtomicBool::new(false),
      observer: Mutex::new(Some(Box::new(observer) as BoxedObserver<Item, Err>)),
    });
    state.observers.push((id, slot.clone()));
    SubjectSubscription { subject: Arc::downgrade(&self.inner), id, slot }
  }
}

/// Registration of one observer on a [`Subject`].
pub struct SubjectSubscription<Item, Err> {
  subject: Weak<Mutex<SubjectState<Item, Err>>>,
  id: usize,
  slot: ObserverSlot<Item, Err>,
}

impl<Item, Err> Subscription for SubjectSubscription<Item, Err> {
  fn unsubscribe(self) {
    if self.slot.closed.swap(true, Ordering::AcqRel) {
      return;
    }
    if let Some(subject) = self.subject.upgrade() {
      let mut state = subject.lock();
      if let Some(pos) = state.observers.iter().position(|(id, _)| *id == self.id) {
        state.observers.remove(pos);
      }
    }
    // A busy lock means an emission is running; it drops the observer once
    // it sees `closed`.
    let observer = self.slot.observer.try_lock().and_then(|mut o| o.take());
    drop(observer);
  }

  fn is_closed(&self) -> bool { self.slot.is_closed() }
}

#[cfg(test)]
mod test {
  use std::convert::Infallible;

  use super::*;
  use crate::prelude::*;

  #[test]
  fn multicast_and_unsubscribe() {
    let mut subject = Subject::<i32, Infallible>::default();
    let a = Arc::new(Mutex::new(vec![]));
    let b = Arc::new(Mutex::new(vec![]));
    let (c_a, c_b) = (a.clone(), b.clone());
    let sub_a = subject.clone().subscribe(move |v| c_a.lock().push(v));
    subject.clone().subscribe(move |v| c_b.lock().push(v));
    assert_eq!(subject.observer_count(), 2);

    subject.next(1);
    sub_a.unsubscribe();
    subject.next(2);

    assert_eq!(*a.lock(), vec![1]);
    assert_eq!(*b.lock(), vec![1, 2]);
    assert_eq!(subject.observer_count(), 1);
  }

  #[test]
  fn late_subscriber_gets_terminal() {
    let subject = Subject::<i32, &'static str>::default();
    subject.clone().error("gone");
    let err = Arc::new(Mutex::new(None));
    let c_err = err.clone();
    let sub = subject
      .clone()
      .subscribe_all(|_| {}, move |e| *c_err.lock() = Some(e), || {});
    assert_eq!(*err.lock(), Some("gone"));
    assert!(sub.is_closed());
    assert!(Observer::<i32, &str>::is_closed(&subject));
  }

  #[test]
  fn values_after_terminal_are_dropped() {
    let mut subject = Subject::<i32, Infallible>::default();
    let hit = Arc::new(Mutex::new(vec![]));
    let c_hit = hit.clone();
    subject.clone().subscribe(move |v| c_hit.lock().push(v));
    subject.next(1);
    subject.clone().complete();
    subject.next(2);
    assert_eq!(*hit.lock(), vec![1]);
    assert_eq!(subject.observer_count(), 0);
  }

  #[test]
  fn subscribe_from_inside_next() {
    let mut subject = Subject::<i32, Infallible>::default();
    let c_subject = subject.clone();
    let nested = Arc::new(Mutex::new(vec![]));
    let c_nested = nested.clone();
    subject.clone().subscribe(move |v| {
      if v == 1 {
        let c_nested = c_nested.clone();
        c_subject.clone().subscribe(move |v| c_nested.lock().push(v));
      }
    });
    subject.next(1);
    subject.next(2);
    assert_eq!(*nested.lock(), vec![2]);
  }
}
