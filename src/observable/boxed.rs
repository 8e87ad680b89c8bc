//! Boxed Observable types for type erasure
//!
//! Lets heterogeneous observables with the same `Item` and `Err` be stored
//! together, as the sequence handed to `catch_all` or
//! `on_error_resume_next` usually needs.

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::{BoxedObserver, Observer},
  subscription::BoxedSubscription,
};

/// Object-safe observable trait for type erasure.
pub trait DynCoreObservable<Item, Err>: Send {
  fn dyn_subscribe(self: Box<Self>, observer: BoxedObserver<Item, Err>) -> BoxedSubscription;

  fn clone_box(&self) -> Box<dyn DynCoreObservable<Item, Err>>;
}

impl<S, Item, Err> DynCoreObservable<Item, Err> for S
where
  S: ObservableType<Item = Item, Err = Err>,
  S: CoreObservable<BoxedObserver<Item, Err>> + Clone + Send + 'static,
  <S as CoreObservable<BoxedObserver<Item, Err>>>::Unsub: Send + 'static,
{
  fn dyn_subscribe(self: Box<Self>, observer: BoxedObserver<Item, Err>) -> BoxedSubscription {
    BoxedSubscription::new((*self).actual_subscribe(observer))
  }

  fn clone_box(&self) -> Box<dyn DynCoreObservable<Item, Err>> { Box::new(self.clone()) }
}

/// A type-erased observable of `Item`s failing with `Err`.
pub struct BoxOp<Item, Err>(Box<dyn DynCoreObservable<Item, Err>>);

impl<Item, Err> BoxOp<Item, Err> {
  pub fn new<S>(source: S) -> Self
  where
    S: DynCoreObservable<Item, Err> + 'static,
  {
    BoxOp(Box::new(source))
  }
}

impl<Item, Err> Clone for BoxOp<Item, Err> {
  fn clone(&self) -> Self { BoxOp(self.0.clone_box()) }
}

impl<Item, Err> ObservableType for BoxOp<Item, Err> {
  type Item = Item;
  type Err = Err;
}

impl<Item, Err, O> CoreObservable<O> for BoxOp<Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
{
  type Unsub = BoxedSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub { self.0.dyn_subscribe(Box::new(observer)) }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn heterogeneous_sources_in_one_vec() {
    let sources: Vec<BoxOp<i32, std::convert::Infallible>> = vec![
      observable::of(1).box_it(),
      observable::from_iter(vec![2, 3]).map(|v| v * 10).box_it(),
      observable::empty().box_it(),
    ];
    let hit = Arc::new(Mutex::new(vec![]));
    for source in sources.clone() {
      let hit = hit.clone();
      source.subscribe(move |v| hit.lock().push(v));
    }
    assert_eq!(*hit.lock(), vec![1, 20, 30]);
  }
}
