use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
};

/// Transforms the error of a sequence.
#[derive(Clone)]
pub struct MapErrOp<S, F> {
  source: S,
  f: F,
}

impl<S, F> MapErrOp<S, F> {
  pub(crate) fn new(source: S, f: F) -> Self { MapErrOp { source, f } }
}

impl<S, F, E> ObservableType for MapErrOp<S, F>
where
  S: ObservableType,
  F: FnMut(S::Err) -> E,
{
  type Item = S::Item;
  type Err = E;
}

impl<S, F, E, O> CoreObservable<O> for MapErrOp<S, F>
where
  S: CoreObservable<MapErrObserver<O, F>>,
  F: FnMut(S::Err) -> E,
  O: Observer<S::Item, E>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self
      .source
      .actual_subscribe(MapErrObserver { observer, f: self.f })
  }
}

pub struct MapErrObserver<O, F> {
  observer: O,
  f: F,
}

impl<O, F, Item, Err, E> Observer<Item, Err> for MapErrObserver<O, F>
where
  O: Observer<Item, E>,
  F: FnMut(Err) -> E,
{
  fn next(&mut self, value: Item) { self.observer.next(value) }

  fn error(mut self, err: Err) {
    let err = (self.f)(err);
    self.observer.error(err)
  }

  fn complete(self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn converts_error() {
    let err = Arc::new(Mutex::new(None));
    let c_err = err.clone();
    observable::throw_err::<i32, _>(42)
      .map_err(|code| format!("code {code}"))
      .subscribe_all(|_| {}, move |e| *c_err.lock() = Some(e), || {});
    assert_eq!(err.lock().as_deref(), Some("code 42"));
  }

  #[test]
  fn fallible_accepts_any_error_type() {
    let hit = Arc::new(Mutex::new(vec![]));
    let c_hit = hit.clone();
    observable::of(1)
      .fallible::<String>()
      .subscribe_all(move |v| c_hit.lock().push(v), |_| unreachable!(), || {});
    assert_eq!(*hit.lock(), vec![1]);
  }
}
