//! Latest-value synchronization of several sources.
//!
//! Every source owns one slot. A value is combined and emitted only once every
//! slot holds a value; from then on each arrival re-emits with the latest of
//! the others. The bookkeeping deciding *whether* to emit or complete lives in
//! [`Readiness`] and is shared by the list form ([`combine_latest_all`]) and
//! the two-source form ([`combine_latest`](crate::observable::Observable::combine_latest)).

use parking_lot::MutexGuard;

use crate::{
  function::{Fallible, Selector, Total},
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  producer,
  sink::{Sink, SinkGate, SinkHandle},
  subscription::EntryId,
};

/// Per-source "has a value" and "is done" flags.
struct Readiness {
  has_value: Vec<bool>,
  done: Vec<bool>,
  with_value: usize,
  done_count: usize,
}

enum Arrival {
  Emit,
  Wait,
  Complete,
}

impl Readiness {
  fn new(n: usize) -> Self {
    Readiness { has_value: vec![false; n], done: vec![false; n], with_value: 0, done_count: 0 }
  }

  fn on_next(&mut self, index: usize) -> Arrival {
    if !self.has_value[index] {
      self.has_value[index] = true;
      self.with_value += 1;
    }
    if self.with_value == self.has_value.len() {
      Arrival::Emit
    } else if self.done.iter().enumerate().all(|(i, done)| i == index || *done) {
      // The missing slots belong to finished sources; nothing can ever pair.
      Arrival::Complete
    } else {
      Arrival::Wait
    }
  }

  /// Returns true when every source is done.
  fn on_complete(&mut self, index: usize) -> bool {
    if !self.done[index] {
      self.done[index] = true;
      self.done_count += 1;
    }
    self.done_count == self.done.len()
  }
}

enum Step<Out, Err> {
  Wait,
  Emit(Out),
  Fail(Err),
  Complete,
}

fn deliver<O, S, Out, Err>(
  sink: &Sink<O, S>, mut gate: MutexGuard<'_, SinkGate<O, S>>, step: Step<Out, Err>,
) where
  O: Observer<Out, Err>,
{
  match step {
    Step::Wait => {}
    Step::Emit(value) => gate.next::<Out, Err>(value),
    Step::Fail(err) => {
      let observer = gate.take_observer();
      drop(gate);
      if let Some(observer) = observer {
        observer.error(err);
      }
      sink.dispose();
    }
    Step::Complete => {
      let observer = gate.take_observer();
      drop(gate);
      if let Some(observer) = observer {
        observer.complete();
      }
      sink.dispose();
    }
  }
}

// ==================== N sources of one type ====================

/// Combine the latest values of every source in `sources` with `f`.
///
/// `f` receives one value per source, in source order. An empty list
/// completes immediately.
///
/// ```
/// use rxcore::prelude::*;
///
/// let sources = vec![observable::of(1), observable::of(2), observable::of(3)];
/// observable::combine_latest_all(sources, |v: Vec<i32>| v.iter().sum::<i32>())
///   .subscribe(|sum| assert_eq!(sum, 6));
/// ```
pub fn combine_latest_all<S, F, Out>(
  sources: impl IntoIterator<Item = S>, f: F,
) -> CombineLatestOp<S, Total<F>>
where
  S: ObservableType,
  F: FnMut(Vec<S::Item>) -> Out,
{
  CombineLatestOp { sources: sources.into_iter().collect(), selector: Total(f) }
}

/// [`combine_latest_all`] with a selector that may fail. A failure becomes
/// the sequence's error and disposes every source.
pub fn try_combine_latest_all<S, F, Out>(
  sources: impl IntoIterator<Item = S>, f: F,
) -> CombineLatestOp<S, Fallible<F>>
where
  S: ObservableType,
  F: FnMut(Vec<S::Item>) -> Result<Out, S::Err>,
{
  CombineLatestOp { sources: sources.into_iter().collect(), selector: Fallible(f) }
}

#[derive(Clone)]
pub struct CombineLatestOp<S, F> {
  sources: Vec<S>,
  selector: F,
}

impl<S, F> ObservableType for CombineLatestOp<S, F>
where
  S: ObservableType,
  F: Selector<Vec<S::Item>, S::Err>,
{
  type Item = F::Output;
  type Err = S::Err;
}

pub struct CombineLatestState<Item, F> {
  readiness: Readiness,
  values: Vec<Option<Item>>,
  selector: F,
}

impl<S, F, O, Item, Err> CoreObservable<O> for CombineLatestOp<S, F>
where
  S: ObservableType<Item = Item, Err = Err>,
  S: CoreObservable<CombineLatestObserver<O, Item, F>>,
  S::Unsub: Send + 'static,
  Item: Clone,
  F: Selector<Vec<Item>, Err>,
  O: Observer<F::Output, Err>,
{
  type Unsub = SinkHandle;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let n = self.sources.len();
    let state = CombineLatestState {
      readiness: Readiness::new(n),
      values: (0..n).map(|_| None).collect(),
      selector: self.selector,
    };
    let sink = Sink::new(observer, state);
    if n == 0 {
      sink.complete::<F::Output, Err>();
      return sink.handle().clone();
    }
    for (index, source) in self.sources.into_iter().enumerate() {
      let attached = producer::attach(source, sink.handle(), |id| CombineLatestObserver {
        sink: sink.clone(),
        index,
        id,
      });
      if !attached {
        break;
      }
    }
    sink.handle().clone()
  }
}

pub struct CombineLatestObserver<O, Item, F> {
  sink: Sink<O, CombineLatestState<Item, F>>,
  index: usize,
  id: EntryId,
}

impl<O, Item, Err, F> Observer<Item, Err> for CombineLatestObserver<O, Item, F>
where
  Item: Clone,
  F: Selector<Vec<Item>, Err>,
  O: Observer<F::Output, Err>,
{
  fn next(&mut self, value: Item) {
    let mut gate = self.sink.lock();
    if gate.is_stopped() {
      return;
    }
    let state = &mut gate.state;
    state.values[self.index] = Some(value);
    let step = match state.readiness.on_next(self.index) {
      Arrival::Wait => Step::Wait,
      Arrival::Complete => Step::Complete,
      Arrival::Emit => {
        let latest = state.values.iter().flatten().cloned().collect();
        match state.selector.select(latest) {
          Ok(out) => Step::Emit(out),
          Err(err) => Step::Fail(err),
        }
      }
    };
    deliver(&self.sink, gate, step);
  }

  fn error(self, err: Err) { self.sink.error::<F::Output, Err>(err) }

  fn complete(self) {
    let mut gate = self.sink.lock();
    if gate.state.readiness.on_complete(self.index) {
      deliver::<_, _, F::Output, Err>(&self.sink, gate, Step::Complete);
    } else {
      drop(gate);
      self.sink.upstream().remove(self.id);
    }
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

// ==================== Two sources ====================

#[derive(Clone)]
pub struct CombineLatestWithOp<A, B, F> {
  left: A,
  right: B,
  f: F,
}

impl<A, B, F> CombineLatestWithOp<A, B, F> {
  pub(crate) fn new(left: A, right: B, f: F) -> Self { CombineLatestWithOp { left, right, f } }
}

impl<A, B, F, Out> ObservableType for CombineLatestWithOp<A, B, F>
where
  A: ObservableType,
  B: ObservableType<Err = A::Err>,
  F: FnMut(A::Item, B::Item) -> Out,
{
  type Item = Out;
  type Err = A::Err;
}

pub struct CombineLatestWithState<L, R, F> {
  readiness: Readiness,
  left: Option<L>,
  right: Option<R>,
  f: F,
}

impl<L, R, F> CombineLatestWithState<L, R, F> {
  fn arrived<Out, Err>(&mut self, index: usize) -> Step<Out, Err>
  where
    L: Clone,
    R: Clone,
    F: FnMut(L, R) -> Out,
  {
    match self.readiness.on_next(index) {
      Arrival::Wait => Step::Wait,
      Arrival::Complete => Step::Complete,
      Arrival::Emit => match (self.left.clone(), self.right.clone()) {
        (Some(l), Some(r)) => Step::Emit((self.f)(l, r)),
        _ => Step::Wait,
      },
    }
  }
}

type WithSink<O, L, R, F> = Sink<O, CombineLatestWithState<L, R, F>>;

impl<A, B, F, O, L, R, Err, Out> CoreObservable<O> for CombineLatestWithOp<A, B, F>
where
  A: ObservableType<Item = L, Err = Err>,
  B: ObservableType<Item = R, Err = Err>,
  A: CoreObservable<CombineLeftObserver<O, L, R, F>>,
  B: CoreObservable<CombineRightObserver<O, L, R, F>>,
  A::Unsub: Send + 'static,
  B::Unsub: Send + 'static,
  L: Clone,
  R: Clone,
  F: FnMut(L, R) -> Out,
  O: Observer<Out, Err>,
{
  type Unsub = SinkHandle;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let state = CombineLatestWithState { readiness: Readiness::new(2), left: None, right: None, f: self.f };
    let sink = Sink::new(observer, state);
    let handle = sink.handle();
    if producer::attach(self.left, handle, |id| CombineLeftObserver { sink: sink.clone(), id }) {
      producer::attach(self.right, handle, |id| CombineRightObserver { sink: sink.clone(), id });
    }
    handle.clone()
  }
}

pub struct CombineLeftObserver<O, L, R, F> {
  sink: WithSink<O, L, R, F>,
  id: EntryId,
}

pub struct CombineRightObserver<O, L, R, F> {
  sink: WithSink<O, L, R, F>,
  id: EntryId,
}

fn side_complete<O, L, R, F, Out, Err>(sink: &WithSink<O, L, R, F>, index: usize, id: EntryId)
where
  O: Observer<Out, Err>,
{
  let mut gate = sink.lock();
  if gate.state.readiness.on_complete(index) {
    deliver::<_, _, Out, Err>(sink, gate, Step::Complete);
  } else {
    drop(gate);
    sink.upstream().remove(id);
  }
}

impl<O, L, R, F, Out, Err> Observer<L, Err> for CombineLeftObserver<O, L, R, F>
where
  L: Clone,
  R: Clone,
  F: FnMut(L, R) -> Out,
  O: Observer<Out, Err>,
{
  fn next(&mut self, value: L) {
    let mut gate = self.sink.lock();
    if gate.is_stopped() {
      return;
    }
    gate.state.left = Some(value);
    let step = gate.state.arrived::<Out, Err>(0);
    deliver(&self.sink, gate, step);
  }

  fn error(self, err: Err) { self.sink.error::<Out, Err>(err) }

  fn complete(self) { side_complete::<_, _, _, _, Out, Err>(&self.sink, 0, self.id) }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

impl<O, L, R, F, Out, Err> Observer<R, Err> for CombineRightObserver<O, L, R, F>
where
  L: Clone,
  R: Clone,
  F: FnMut(L, R) -> Out,
  O: Observer<Out, Err>,
{
  fn next(&mut self, value: R) {
    let mut gate = self.sink.lock();
    if gate.is_stopped() {
      return;
    }
    gate.state.right = Some(value);
    let step = gate.state.arrived::<Out, Err>(1);
    deliver(&self.sink, gate, step);
  }

  fn error(self, err: Err) { self.sink.error::<Out, Err>(err) }

  fn complete(self) { side_complete::<_, _, _, _, Out, Err>(&self.sink, 1, self.id) }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

#[cfg(test)]
mod test {
  use std::{convert::Infallible, sync::Arc};

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn waits_for_every_source() {
    let mut first = Subject::<i32, Infallible>::default();
    let mut second = Subject::<i32, Infallible>::default();
    let hit = Arc::new(Mutex::new(vec![]));
    let c_hit = hit.clone();
    first
      .clone()
      .combine_latest(second.clone(), |a, b| (a, b))
      .subscribe(move |v| c_hit.lock().push(v));

    first.next(1);
    first.next(2);
    assert!(hit.lock().is_empty());
    second.next(10);
    assert_eq!(*hit.lock(), vec![(2, 10)]);
    first.next(3);
    second.next(20);
    assert_eq!(*hit.lock(), vec![(2, 10), (3, 10), (3, 20)]);
  }

  #[test]
  fn completes_when_all_sources_complete() {
    let first = Subject::<i32, Infallible>::default();
    let mut second = Subject::<i32, Infallible>::default();
    let completed = Arc::new(Mutex::new(false));
    let c_completed = completed.clone();
    first
      .clone()
      .combine_latest(second.clone(), |a, b| a + b)
      .subscribe_all(|_| {}, |e| match e {}, move || *c_completed.lock() = true);

    first.clone().next(1);
    first.clone().complete();
    assert!(!*completed.lock());
    assert_eq!(first.observer_count(), 0);
    second.next(2);
    second.clone().complete();
    assert!(*completed.lock());
  }

  #[test]
  fn completes_when_the_missing_sources_are_done() {
    let first = Subject::<i32, Infallible>::default();
    let second = Subject::<i32, Infallible>::default();
    let completed = Arc::new(Mutex::new(false));
    let c_completed = completed.clone();
    observable::combine_latest_all(vec![first.clone(), second.clone()], |v: Vec<i32>| v)
      .subscribe_all(|_| unreachable!(), |e| match e {}, move || *c_completed.lock() = true);

    first.clone().complete();
    assert!(!*completed.lock());
    second.clone().next(5);
    assert!(*completed.lock());
    assert_eq!(second.observer_count(), 0);
  }

  #[test]
  fn n_sources_in_source_order() {
    let sources: Vec<_> = (0..3).map(|_| Subject::<i32, Infallible>::default()).collect();
    let hit = Arc::new(Mutex::new(vec![]));
    let c_hit = hit.clone();
    observable::combine_latest_all(sources.clone(), |v: Vec<i32>| v)
      .subscribe(move |v| c_hit.lock().push(v));
    sources[2].clone().next(3);
    sources[0].clone().next(1);
    sources[1].clone().next(2);
    sources[0].clone().next(4);
    assert_eq!(*hit.lock(), vec![vec![1, 2, 3], vec![4, 2, 3]]);
  }

  #[test]
  fn empty_list_completes() {
    let completed = Arc::new(Mutex::new(false));
    let c_completed = completed.clone();
    observable::combine_latest_all(Vec::<observable::Empty<i32>>::new(), |v: Vec<i32>| v.len())
      .subscribe_all(|_| unreachable!(), |e| match e {}, move || *c_completed.lock() = true);
    assert!(*completed.lock());
  }

  #[test]
  fn failing_selector_errors_and_disposes() {
    let a = Subject::<i32, String>::default();
    let b = Subject::<i32, String>::default();
    let err = Arc::new(Mutex::new(None));
    let c_err = err.clone();
    observable::try_combine_latest_all(vec![a.clone(), b.clone()], |v: Vec<i32>| {
      if v[0] + v[1] > 5 { Err(format!("sum {}", v[0] + v[1])) } else { Ok(v[0] + v[1]) }
    })
    .subscribe_all(|_| {}, move |e| *c_err.lock() = Some(e), || unreachable!());
    a.clone().next(1);
    b.clone().next(2);
    b.clone().next(9);
    assert_eq!(err.lock().as_deref(), Some("sum 10"));
    assert_eq!(a.observer_count(), 0);
    assert_eq!(b.observer_count(), 0);
  }

  #[test]
  fn error_from_either_side_is_delivered_once() {
    let a = Subject::<i32, &'static str>::default();
    let b = Subject::<i32, &'static str>::default();
    let count = Arc::new(Mutex::new(0));
    let c_count = count.clone();
    a.clone()
      .combine_latest(b.clone(), |x, y| x * y)
      .subscribe_all(|_| {}, move |_| *c_count.lock() += 1, || unreachable!());
    a.clone().error("a");
    b.clone().error("b");
    assert_eq!(*count.lock(), 1);
  }
}
