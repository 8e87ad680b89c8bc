use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  producer,
  sink::{Sink, SinkHandle},
};

/// Interleaves two sequences of the same type.
///
/// The first error from either side terminates the merge and disposes the
/// other side; completion waits for both.
#[derive(Clone)]
pub struct MergeOp<S1, S2> {
  source1: S1,
  source2: S2,
}

impl<S1, S2> MergeOp<S1, S2> {
  pub(crate) fn new(source1: S1, source2: S2) -> Self { MergeOp { source1, source2 } }
}

impl<S1: ObservableType, S2> ObservableType for MergeOp<S1, S2> {
  type Item = S1::Item;
  type Err = S1::Err;
}

impl<S1, S2, O> CoreObservable<O> for MergeOp<S1, S2>
where
  S1: CoreObservable<MergeObserver<O>>,
  S2: CoreObservable<MergeObserver<O>, Item = S1::Item, Err = S1::Err>,
  S1::Unsub: Send + 'static,
  S2::Unsub: Send + 'static,
  O: Observer<S1::Item, S1::Err>,
{
  type Unsub = SinkHandle;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let sink = Sink::new(observer, 2);
    let handle = sink.handle().clone();
    producer::attach(self.source1, &handle, |_| MergeObserver { sink: sink.clone() });
    producer::attach(self.source2, &handle, |_| MergeObserver { sink });
    handle
  }
}

/// One side of a binary merge; the state counts the sides still running.
pub struct MergeObserver<O> {
  sink: Sink<O, usize>,
}

impl<O, Item, Err> Observer<Item, Err> for MergeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.sink.next::<Item, Err>(value) }

  fn error(self, err: Err) { self.sink.error::<Item, Err>(err) }

  fn complete(self) {
    let done = {
      let mut gate = self.sink.lock();
      gate.state -= 1;
      gate.state == 0
    };
    if done {
      self.sink.complete::<Item, Err>();
    }
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

#[cfg(test)]
mod test {
  use std::{convert::Infallible, sync::Arc};

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn odd_even_merge() {
    let numbers = Arc::new(Mutex::new(vec![]));
    let completed = Arc::new(Mutex::new(0));
    let (c_numbers, c_completed) = (numbers.clone(), completed.clone());
    let odd = observable::from_iter((0..10).filter(|v| v % 2 == 1));
    let even = observable::from_iter((0..10).filter(|v| v % 2 == 0));
    odd.merge(even).subscribe_all(
      move |v| c_numbers.lock().push(v),
      |e| match e {},
      move || *c_completed.lock() += 1,
    );
    assert_eq!(*numbers.lock(), vec![1, 3, 5, 7, 9, 0, 2, 4, 6, 8]);
    assert_eq!(*completed.lock(), 1);
  }

  #[test]
  fn completes_only_after_both() {
    let mut even = Subject::<i32, Infallible>::default();
    let mut odd = Subject::<i32, Infallible>::default();
    let completed = Arc::new(Mutex::new(false));
    let c_completed = completed.clone();
    even
      .clone()
      .merge(odd.clone())
      .subscribe_all(|_| {}, |e| match e {}, move || *c_completed.lock() = true);
    even.next(0);
    odd.next(1);
    even.clone().complete();
    assert!(!*completed.lock());
    odd.clone().complete();
    assert!(*completed.lock());
  }

  #[test]
  fn error_disposes_other_side() {
    let left = Subject::<i32, &'static str>::default();
    let mut right = Subject::<i32, &'static str>::default();
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    left.clone().merge(right.clone()).subscribe_all(
      move |v| l1.lock().push(v.to_string()),
      move |e| l2.lock().push(e.to_string()),
      || unreachable!(),
    );
    right.next(1);
    left.clone().error("left failed");
    right.next(2);
    assert_eq!(*log.lock(), vec!["1", "left failed"]);
    assert_eq!(right.observer_count(), 0);
  }
}
