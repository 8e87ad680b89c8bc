//! Flattening of a sequence of sequences with bounded concurrency.
//!
//! The outer sequence and every running inner share one [`Sink`]. Its state
//! tracks the inners that are running, the ones waiting for a free slot, and
//! whether the outer has completed. Downstream completes exactly when the
//! outer has completed, no inner is running and none is waiting.
//!
//! Starting queued inners is trampolined: whoever finds work to do while no
//! other caller is draining becomes the drainer and subscribes inners in a
//! loop, outside the gate. An inner that completes synchronously during its
//! own subscribe only updates the counters; the loop picks up the freed slot
//! on its next iteration instead of recursing.

use std::collections::VecDeque;

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  producer,
  sink::{Sink, SinkHandle},
  subscription::EntryId,
};

#[derive(Clone)]
pub struct MergeAllOp<S> {
  source: S,
  max_concurrent: usize,
}

impl<S> MergeAllOp<S> {
  pub(crate) fn new(source: S, max_concurrent: usize) -> Self {
    MergeAllOp { source, max_concurrent: max_concurrent.max(1) }
  }
}

impl<S> ObservableType for MergeAllOp<S>
where
  S: ObservableType,
  S::Item: ObservableType,
{
  type Item = <S::Item as ObservableType>::Item;
  type Err = S::Err;
}

/// Subscribes one inner into the sink; false if the sink was disposed.
type StartInner<O, Inner> = fn(Inner, &Sink<O, MergeAllState<O, Inner>>) -> bool;

pub struct MergeAllState<O, Inner> {
  max_concurrent: usize,
  active: usize,
  queue: VecDeque<Inner>,
  outer_done: bool,
  draining: bool,
  start: StartInner<O, Inner>,
}

impl<S, Inner, O> CoreObservable<O> for MergeAllOp<S>
where
  S: ObservableType<Item = Inner>,
  S: CoreObservable<MergeAllOuterObserver<O, Inner>>,
  S::Unsub: Send + 'static,
  Inner: CoreObservable<MergeAllInnerObserver<O, Inner>, Err = S::Err>,
  Inner::Unsub: Send + 'static,
  O: Observer<Inner::Item, S::Err>,
{
  type Unsub = SinkHandle;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let state = MergeAllState {
      max_concurrent: self.max_concurrent,
      active: 0,
      queue: VecDeque::new(),
      outer_done: false,
      draining: false,
      start: start_inner::<O, Inner>,
    };
    let sink = Sink::new(observer, state);
    let handle = sink.handle().clone();
    producer::run(self.source, MergeAllOuterObserver { sink }, handle)
  }
}

fn start_inner<O, Inner>(inner: Inner, sink: &Sink<O, MergeAllState<O, Inner>>) -> bool
where
  Inner: CoreObservable<MergeAllInnerObserver<O, Inner>>,
  Inner::Unsub: Send + 'static,
{
  producer::attach(inner, sink.handle(), |id| MergeAllInnerObserver { sink: sink.clone(), id })
}

pub struct MergeAllOuterObserver<O, Inner> {
  sink: Sink<O, MergeAllState<O, Inner>>,
}

pub struct MergeAllInnerObserver<O, Inner> {
  sink: Sink<O, MergeAllState<O, Inner>>,
  id: EntryId,
}

impl<O, Inner, Err> Observer<Inner, Err> for MergeAllOuterObserver<O, Inner>
where
  Inner: ObservableType<Err = Err>,
  O: Observer<Inner::Item, Err>,
{
  fn next(&mut self, inner: Inner) {
    {
      let mut gate = self.sink.lock();
      if gate.is_stopped() {
        return;
      }
      gate.state.queue.push_back(inner);
    }
    drain::<O, Inner, Inner::Item, Err>(&self.sink);
  }

  fn error(self, err: Err) { self.sink.error::<Inner::Item, Err>(err) }

  fn complete(self) {
    self.sink.lock().state.outer_done = true;
    drain::<O, Inner, Inner::Item, Err>(&self.sink);
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

impl<O, Inner, Item, Err> Observer<Item, Err> for MergeAllInnerObserver<O, Inner>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.sink.next::<Item, Err>(value) }

  fn error(self, err: Err) { self.sink.error::<Item, Err>(err) }

  fn complete(self) {
    self.sink.upstream().remove(self.id);
    self.sink.lock().state.active -= 1;
    drain::<O, Inner, Item, Err>(&self.sink);
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

/// Clears the `draining` flag when the drain loop unwinds, so a panicking
/// inner subscription does not wedge the operator.
struct DrainGuard<'a, O, Inner>(&'a Sink<O, MergeAllState<O, Inner>>);

impl<O, Inner> Drop for DrainGuard<'_, O, Inner> {
  fn drop(&mut self) {
    if std::thread::panicking() {
      self.0.lock().state.draining = false;
    }
  }
}

/// Start queued inners while slots are free, and complete downstream once
/// everything has finished. Only one caller drains at a time.
fn drain<O, Inner, Item, Err>(sink: &Sink<O, MergeAllState<O, Inner>>)
where
  O: Observer<Item, Err>,
{
  {
    let mut gate = sink.lock();
    if gate.state.draining {
      return;
    }
    gate.state.draining = true;
  }
  let _unwind = DrainGuard(sink);
  let mut gate = sink.lock();
  loop {
    if gate.is_stopped() {
      gate.state.queue.clear();
      gate.state.draining = false;
      return;
    }
    let state = &mut gate.state;
    if state.active < state.max_concurrent {
      if let Some(inner) = state.queue.pop_front() {
        state.active += 1;
        let start = state.start;
        drop(gate);
        let started = start(inner, sink);
        gate = sink.lock();
        if !started {
          gate.state.active -= 1;
        }
        continue;
      }
    }
    let finished = state.outer_done && state.active == 0 && state.queue.is_empty();
    state.draining = false;
    if finished {
      let observer = gate.take_observer();
      drop(gate);
      if let Some(observer) = observer {
        observer.complete();
      }
      sink.dispose();
    }
    return;
  }
}

#[cfg(test)]
mod test {
  use std::{
    convert::Infallible,
    sync::{
      atomic::{AtomicUsize, Ordering},
      Arc,
    },
  };

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn flattens_in_subscription_order() {
    let hit = Arc::new(Mutex::new(vec![]));
    let completed = Arc::new(Mutex::new(false));
    let (c_hit, c_completed) = (hit.clone(), completed.clone());
    observable::from_iter(vec![vec![1, 2, 3], vec![4, 5], vec![6, 7, 8]])
      .map(observable::from_iter)
      .merge_all(usize::MAX)
      .subscribe_all(
        move |v| c_hit.lock().push(v),
        |e| match e {},
        move || *c_completed.lock() = true,
      );
    assert_eq!(*hit.lock(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert!(*completed.lock());
  }

  #[test]
  fn bounded_concurrency_queues_inners() {
    let outer = Subject::<Subject<i32, Infallible>, Infallible>::default();
    let inners: Vec<_> = (0..3).map(|_| Subject::<i32, Infallible>::default()).collect();
    let hit = Arc::new(Mutex::new(vec![]));
    let completed = Arc::new(Mutex::new(false));
    let (c_hit, c_completed) = (hit.clone(), completed.clone());
    outer.clone().merge_all(2).subscribe_all(
      move |v| c_hit.lock().push(v),
      |e| match e {},
      move || *c_completed.lock() = true,
    );

    let mut o = outer.clone();
    for inner in &inners {
      o.next(inner.clone());
    }
    assert_eq!(inners[0].observer_count(), 1);
    assert_eq!(inners[1].observer_count(), 1);
    assert_eq!(inners[2].observer_count(), 0);

    inners[2].clone().next(99);
    inners[0].clone().next(1);
    inners[0].clone().complete();
    assert_eq!(inners[2].observer_count(), 1);
    inners[2].clone().next(3);

    outer.clone().complete();
    inners[1].clone().complete();
    assert!(!*completed.lock());
    inners[2].clone().complete();
    assert!(*completed.lock());
    assert_eq!(*hit.lock(), vec![1, 3]);
  }

  #[test]
  fn concat_of_many_synchronous_sources_does_not_recurse() {
    let count = Arc::new(AtomicUsize::new(0));
    let c_count = count.clone();
    observable::from_iter(0..100_000)
      .map(observable::of)
      .concat_all()
      .subscribe(move |_| {
        c_count.fetch_add(1, Ordering::Relaxed);
      });
    assert_eq!(count.load(Ordering::Relaxed), 100_000);
  }

  #[test]
  fn inner_error_terminates_everything() {
    let mut outer = Subject::<Subject<i32, &'static str>, &'static str>::default();
    let a = Subject::<i32, &'static str>::default();
    let b = Subject::<i32, &'static str>::default();
    let err = Arc::new(Mutex::new(None));
    let c_err = err.clone();
    outer
      .clone()
      .merge_all(usize::MAX)
      .subscribe_all(|_| {}, move |e| *c_err.lock() = Some(e), || unreachable!());
    outer.next(a.clone());
    outer.next(b.clone());
    a.clone().error("inner");
    assert_eq!(*err.lock(), Some("inner"));
    assert_eq!(b.observer_count(), 0);
    assert_eq!(outer.observer_count(), 0);
  }

  #[test]
  fn flat_map() {
    let hit = Arc::new(Mutex::new(vec![]));
    let c_hit = hit.clone();
    observable::from_iter(1..=3)
      .flat_map(|v| observable::from_iter(0..v))
      .subscribe(move |v| c_hit.lock().push(v));
    assert_eq!(*hit.lock(), vec![0, 0, 1, 0, 1, 2]);
  }

  #[test]
  fn keeps_draining_after_an_inner_subscribe_panics() {
    let mut outer = Subject::<BoxOp<i32, Infallible>, Infallible>::default();
    let hit = Arc::new(Mutex::new(vec![]));
    let c_hit = hit.clone();
    outer.clone().merge_all(usize::MAX).subscribe(move |v| c_hit.lock().push(v));

    let broken = observable::defer(|| -> BoxOp<i32, Infallible> { panic!("no source") }).box_it();
    let mut c_outer = outer.clone();
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || c_outer.next(broken)));
    assert!(res.is_err());

    outer.next(observable::of(5).box_it());
    assert_eq!(*hit.lock(), vec![5]);
  }
}
