use crate::{
  error::RxError,
  observable::{CoreObservable, ObservableType},
  observer::Observer,
};

/// The Scan operator applies a function to the first item emitted by the
/// source observable and then emits the result of that function as its
/// own first emission. It continues to feed back its own emissions along with
/// the subsequent emissions from the source.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::from_iter(vec![1, 1, 1, 1, 1])
///   .scan(100, |acc, v| acc + v)
///   .subscribe(|v| println!("{}", v));
///
/// // print log:
/// // 101
/// // 102
/// // 103
/// // 104
/// // 105
/// ```
#[derive(Clone)]
pub struct ScanOp<S, F, Acc> {
  source: S,
  f: F,
  seed: Acc,
}

impl<S, F, Acc> ScanOp<S, F, Acc> {
  pub(crate) fn new(source: S, seed: Acc, f: F) -> Self { ScanOp { source, f, seed } }
}

impl<S: ObservableType, F, Acc> ObservableType for ScanOp<S, F, Acc> {
  type Item = Acc;
  type Err = S::Err;
}

impl<S, F, Acc, O> CoreObservable<O> for ScanOp<S, F, Acc>
where
  S: CoreObservable<ScanObserver<O, F, Acc>>,
  F: FnMut(Acc, S::Item) -> Acc,
  Acc: Clone,
  O: Observer<Acc, S::Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self
      .source
      .actual_subscribe(ScanObserver { observer, f: self.f, acc: Some(self.seed) })
  }
}

pub struct ScanObserver<O, F, Acc> {
  observer: O,
  f: F,
  acc: Option<Acc>,
}

impl<O, F, Acc, Item, Err> Observer<Item, Err> for ScanObserver<O, F, Acc>
where
  O: Observer<Acc, Err>,
  F: FnMut(Acc, Item) -> Acc,
  Acc: Clone,
{
  fn next(&mut self, value: Item) {
    if let Some(acc) = self.acc.take() {
      let acc = (self.f)(acc, value);
      self.acc = Some(acc.clone());
      self.observer.next(acc);
    }
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

/// Folds the sequence without a seed and emits the result on completion.
#[derive(Clone)]
pub struct ReduceOp<S, F> {
  source: S,
  f: F,
}

impl<S, F> ReduceOp<S, F> {
  pub(crate) fn new(source: S, f: F) -> Self { ReduceOp { source, f } }
}

impl<S: ObservableType, F> ObservableType for ReduceOp<S, F> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, F, O, Item, Err> CoreObservable<O> for ReduceOp<S, F>
where
  S: ObservableType<Item = Item, Err = Err>,
  S: CoreObservable<ReduceObserver<O, F, Item>>,
  Err: From<RxError>,
  F: FnMut(Item, Item) -> Item,
  O: Observer<Item, Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self
      .source
      .actual_subscribe(ReduceObserver { observer, f: self.f, acc: None })
  }
}

pub struct ReduceObserver<O, F, Item> {
  observer: O,
  f: F,
  acc: Option<Item>,
}

impl<O, F, Item, Err> Observer<Item, Err> for ReduceObserver<O, F, Item>
where
  O: Observer<Item, Err>,
  F: FnMut(Item, Item) -> Item,
  Err: From<RxError>,
{
  fn next(&mut self, value: Item) {
    let acc = match self.acc.take() {
      Some(acc) => (self.f)(acc, value),
      None => value,
    };
    self.acc = Some(acc);
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(self) {
    let mut observer = self.observer;
    match self.acc {
      Some(acc) => {
        observer.next(acc);
        observer.complete();
      }
      None => observer.error(RxError::EmptySequence.into()),
    }
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::{error::RxError, prelude::*};

  #[test]
  fn scan_emits_each_accumulation() {
    let emitted = Arc::new(Mutex::new(vec![]));
    let c_emitted = emitted.clone();
    observable::from_iter(vec![1, 2, 3])
      .scan(10, |acc, v| acc + v)
      .subscribe(move |v| c_emitted.lock().push(v));
    assert_eq!(*emitted.lock(), vec![11, 13, 16]);
  }

  #[test]
  fn reduce_sums() {
    let sum = Arc::new(Mutex::new(None));
    let c_sum = sum.clone();
    observable::from_iter(1..=4)
      .fallible::<RxError>()
      .reduce(|a, b| a + b)
      .subscribe_all(move |v| *c_sum.lock() = Some(v), |_| unreachable!(), || {});
    assert_eq!(*sum.lock(), Some(10));
  }

  #[test]
  fn reduce_on_empty_fails() {
    let err = Arc::new(Mutex::new(None));
    let c_err = err.clone();
    observable::empty::<i32>()
      .fallible::<RxError>()
      .reduce(|a, b| a + b)
      .subscribe_all(|_| unreachable!(), move |e| *c_err.lock() = Some(e), || unreachable!());
    assert_eq!(*err.lock(), Some(RxError::EmptySequence));
  }
}
