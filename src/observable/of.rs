use std::{convert::Infallible, marker::PhantomData};

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
};

/// Creates an observable producing a single value.
///
/// Completes immediately after emitting the value given. Never emits an error.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::of(123).subscribe(|v| println!("{},", v));
/// ```
pub fn of<Item>(v: Item) -> OfObservable<Item> { OfObservable(v) }

#[derive(Clone)]
pub struct OfObservable<Item>(pub(crate) Item);

impl<Item> ObservableType for OfObservable<Item> {
  type Item = Item;
  type Err = Infallible;
}

impl<Item, O> CoreObservable<O> for OfObservable<Item>
where
  O: Observer<Item, Infallible>,
{
  type Unsub = ();

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    observer.next(self.0);
    observer.complete();
  }
}

/// An observable that completes without emitting.
pub fn empty<Item>() -> Empty<Item> { Empty(PhantomData) }

pub struct Empty<Item>(PhantomData<fn() -> Item>);

impl<Item> Clone for Empty<Item> {
  fn clone(&self) -> Self { Empty(PhantomData) }
}

impl<Item> ObservableType for Empty<Item> {
  type Item = Item;
  type Err = Infallible;
}

impl<Item, O> CoreObservable<O> for Empty<Item>
where
  O: Observer<Item, Infallible>,
{
  type Unsub = ();

  fn actual_subscribe(self, observer: O) -> Self::Unsub { observer.complete() }
}

/// An observable that never emits and never terminates.
pub fn never<Item>() -> Never<Item> { Never(PhantomData) }

pub struct Never<Item>(PhantomData<fn() -> Item>);

impl<Item> Clone for Never<Item> {
  fn clone(&self) -> Self { Never(PhantomData) }
}

impl<Item> ObservableType for Never<Item> {
  type Item = Item;
  type Err = Infallible;
}

impl<Item, O> CoreObservable<O> for Never<Item>
where
  O: Observer<Item, Infallible>,
{
  type Unsub = ();

  fn actual_subscribe(self, _observer: O) -> Self::Unsub {}
}

/// An observable that fails immediately with `err`.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::throw_err::<i32, _>("boom").subscribe_all(
///   |_| unreachable!(),
///   |e| assert_eq!(e, "boom"),
///   || unreachable!(),
/// );
/// ```
pub fn throw_err<Item, Err>(err: Err) -> ThrowErr<Item, Err> { ThrowErr(err, PhantomData) }

pub struct ThrowErr<Item, Err>(Err, PhantomData<fn() -> Item>);

impl<Item, Err: Clone> Clone for ThrowErr<Item, Err> {
  fn clone(&self) -> Self { ThrowErr(self.0.clone(), PhantomData) }
}

impl<Item, Err> ObservableType for ThrowErr<Item, Err> {
  type Item = Item;
  type Err = Err;
}

impl<Item, Err, O> CoreObservable<O> for ThrowErr<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = ();

  fn actual_subscribe(self, observer: O) -> Self::Unsub { observer.error(self.0) }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn of_emits_then_completes() {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    observable::of(100).subscribe_all(
      move |v| l1.lock().push(v),
      |e: std::convert::Infallible| match e {},
      move || l2.lock().push(-1),
    );
    assert_eq!(*log.lock(), vec![100, -1]);
  }

  #[test]
  fn empty_and_never() {
    let completed = Arc::new(Mutex::new(false));
    let c = completed.clone();
    observable::empty::<i32>().subscribe_all(|_| unreachable!(), |e| match e {}, move || *c.lock() = true);
    assert!(*completed.lock());

    observable::never::<i32>().subscribe(|_| unreachable!());
  }

  #[test]
  fn throw_err() {
    let err = Arc::new(Mutex::new(None));
    let e = err.clone();
    observable::throw_err::<i32, _>("oops").subscribe_all(
      |_| unreachable!(),
      move |v| *e.lock() = Some(v),
      || unreachable!(),
    );
    assert_eq!(*err.lock(), Some("oops"));
  }
}
