use std::marker::PhantomData;

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
  Ascending,
  Descending,
}

/// Buffers the whole sequence and, on completion, emits it sorted by key.
///
/// The sort is stable: elements with equal keys keep their arrival order in
/// both directions.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::from_iter(vec!["ccc", "a", "bb", "d"])
///   .order_by(|s| s.len())
///   .collect::<Vec<_>>()
///   .subscribe(|v| assert_eq!(v, vec!["a", "d", "bb", "ccc"]));
/// ```
pub struct OrderByOp<S, F, Key> {
  source: S,
  key: F,
  direction: Direction,
  _key: PhantomData<fn() -> Key>,
}

impl<S: Clone, F: Clone, Key> Clone for OrderByOp<S, F, Key> {
  fn clone(&self) -> Self { OrderByOp::new(self.source.clone(), self.key.clone(), self.direction) }
}

impl<S, F, Key> OrderByOp<S, F, Key> {
  pub(crate) fn new(source: S, key: F, direction: Direction) -> Self {
    OrderByOp { source, key, direction, _key: PhantomData }
  }
}

impl<S: ObservableType, F, Key> ObservableType for OrderByOp<S, F, Key> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, F, Key, O, Item, Err> CoreObservable<O> for OrderByOp<S, F, Key>
where
  S: ObservableType<Item = Item, Err = Err> + CoreObservable<OrderByObserver<O, F, Key, Item>>,
  F: FnMut(&Item) -> Key,
  Key: Ord,
  O: Observer<Item, Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let observer =
      OrderByObserver { observer, key: self.key, direction: self.direction, buffer: Vec::new() };
    self.source.actual_subscribe(observer)
  }
}

pub struct OrderByObserver<O, F, Key, Item> {
  observer: O,
  key: F,
  direction: Direction,
  buffer: Vec<(Key, Item)>,
}

impl<O, F, Key, Item, Err> Observer<Item, Err> for OrderByObserver<O, F, Key, Item>
where
  F: FnMut(&Item) -> Key,
  Key: Ord,
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    let key = (self.key)(&value);
    self.buffer.push((key, value));
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(mut self) {
    match self.direction {
      Direction::Ascending => self.buffer.sort_by(|a, b| a.0.cmp(&b.0)),
      Direction::Descending => self.buffer.sort_by(|a, b| b.0.cmp(&a.0)),
    }
    for (_, value) in self.buffer {
      if self.observer.is_closed() {
        return;
      }
      self.observer.next(value);
    }
    self.observer.complete();
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn ascending_is_stable() {
    let hit = Arc::new(Mutex::new(vec![]));
    let c_hit = hit.clone();
    observable::from_iter(vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')])
      .order_by(|(k, _)| *k)
      .subscribe(move |(_, v)| c_hit.lock().push(v));
    assert_eq!(*hit.lock(), vec!['b', 'd', 'a', 'c']);
  }

  #[test]
  fn descending_is_stable() {
    let hit = Arc::new(Mutex::new(vec![]));
    let c_hit = hit.clone();
    observable::from_iter(vec![(2, 'a'), (1, 'b'), (2, 'c'), (3, 'd')])
      .order_by_desc(|(k, _)| *k)
      .subscribe(move |(_, v)| c_hit.lock().push(v));
    assert_eq!(*hit.lock(), vec!['d', 'a', 'c', 'b']);
  }

  #[test]
  fn nothing_before_completion() {
    let mut subject = Subject::<i32, std::convert::Infallible>::default();
    let hit = Arc::new(Mutex::new(vec![]));
    let c_hit = hit.clone();
    subject.clone().order_by(|v| -v).subscribe(move |v| c_hit.lock().push(v));
    subject.next(1);
    subject.next(3);
    assert!(hit.lock().is_empty());
    subject.clone().complete();
    assert_eq!(*hit.lock(), vec![3, 1]);
  }
}
