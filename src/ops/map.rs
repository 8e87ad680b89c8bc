use crate::{
  function::Selector,
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  subscription::{SingleAssignmentSubscription, Subscription},
};

/// Applies a selector to every value. A failing selector turns into the
/// sequence's error and disposes upstream.
#[derive(Clone)]
pub struct MapOp<S, F> {
  source: S,
  selector: F,
}

impl<S, F> MapOp<S, F> {
  pub(crate) fn new(source: S, selector: F) -> Self { MapOp { source, selector } }
}

impl<S, F> ObservableType for MapOp<S, F>
where
  S: ObservableType,
  F: Selector<S::Item, S::Err>,
{
  type Item = F::Output;
  type Err = S::Err;
}

impl<S, F, O> CoreObservable<O> for MapOp<S, F>
where
  S: CoreObservable<MapObserver<O, F>>,
  S::Unsub: Send + 'static,
  F: Selector<S::Item, S::Err>,
  O: Observer<F::Output, S::Err>,
{
  type Unsub = SingleAssignmentSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let upstream = SingleAssignmentSubscription::new();
    let observer = MapObserver {
      observer: Some(observer),
      selector: self.selector,
      upstream: upstream.clone(),
    };
    upstream.assign(self.source.actual_subscribe(observer));
    upstream
  }
}

pub struct MapObserver<O, F> {
  observer: Option<O>,
  selector: F,
  upstream: SingleAssignmentSubscription,
}

impl<O, F, Item, Err> Observer<Item, Err> for MapObserver<O, F>
where
  F: Selector<Item, Err>,
  O: Observer<F::Output, Err>,
{
  fn next(&mut self, value: Item) {
    if self.observer.is_none() {
      return;
    }
    match self.selector.select(value) {
      Ok(v) => self.observer.next(v),
      Err(err) => {
        self.observer.take().error(err);
        self.upstream.clone().unsubscribe();
      }
    }
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn primitive_type() {
    let i = Arc::new(Mutex::new(0));
    let c_i = i.clone();
    observable::from_iter(100..101)
      .map(|v| v * 2)
      .subscribe(move |v| *c_i.lock() = v);
    assert_eq!(*i.lock(), 200);
  }

  #[test]
  fn map_types_mixed() {
    let i = Arc::new(Mutex::new(0));
    let c_i = i.clone();
    observable::from_iter(vec!['a', 'b', 'c'])
      .map(|_| 1)
      .subscribe(move |v| *c_i.lock() += v);
    assert_eq!(*i.lock(), 3);
  }

  #[test]
  fn failing_selector_errors_and_disposes() {
    let mut subject = Subject::<i32, String>::default();
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    subject
      .clone()
      .try_map(|v| if v < 3 { Ok(v) } else { Err(format!("too big: {v}")) })
      .subscribe_all(
        move |v| l1.lock().push(v.to_string()),
        move |e| l2.lock().push(e),
        || unreachable!(),
      );
    for v in 1..=4 {
      subject.next(v);
    }
    assert_eq!(*log.lock(), vec!["1", "2", "too big: 3"]);
    assert_eq!(subject.observer_count(), 0);
  }
}
