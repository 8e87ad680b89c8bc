use std::convert::Infallible;

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
};

/// Creates an observable that emits every element of an iterator, then
/// completes.
///
/// The iterator is pulled lazily and only while the observer is open: once
/// a downstream operator closes the chain, no further element is requested.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::from_iter(vec![0, 1, 2, 3]).subscribe(|v| println!("{},", v));
/// ```
pub fn from_iter<Iter>(iter: Iter) -> FromIter<Iter>
where
  Iter: IntoIterator,
{
  FromIter(iter)
}

#[derive(Clone)]
pub struct FromIter<Iter>(Iter);

impl<Iter: IntoIterator> ObservableType for FromIter<Iter> {
  type Item = Iter::Item;
  type Err = Infallible;
}

impl<Iter, O> CoreObservable<O> for FromIter<Iter>
where
  Iter: IntoIterator,
  O: Observer<Iter::Item, Infallible>,
{
  type Unsub = ();

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    let mut iter = self.0.into_iter();
    loop {
      if observer.is_closed() {
        return;
      }
      match iter.next() {
        Some(v) => observer.next(v),
        None => break,
      }
    }
    observer.complete();
  }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn emits_in_order() {
    let hit = Arc::new(Mutex::new(vec![]));
    let completed = Arc::new(Mutex::new(false));
    let (h, c) = (hit.clone(), completed.clone());
    observable::from_iter(0..10).subscribe_all(
      move |v| h.lock().push(v),
      |e| match e {},
      move || *c.lock() = true,
    );
    assert_eq!(*hit.lock(), (0..10).collect::<Vec<_>>());
    assert!(*completed.lock());
  }

  #[test]
  fn fork() {
    let count = Arc::new(Mutex::new(0));
    let c1 = count.clone();
    let c2 = count.clone();
    let source = observable::from_iter(vec![0; 100]);
    source.clone().subscribe(move |_| *c1.lock() += 1);
    source.subscribe(move |_| *c2.lock() += 1);
    assert_eq!(*count.lock(), 200);
  }
}
