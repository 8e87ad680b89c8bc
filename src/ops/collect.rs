//! Terminal aggregation into collections.
//!
//! Each operator accumulates every value and emits the finished collection
//! once, right before completing. An error discards what was gathered.

use std::{
  collections::{hash_map::Entry, HashMap},
  hash::Hash,
  marker::PhantomData,
};

use crate::{
  error::RxError,
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  subscription::{SingleAssignmentSubscription, Subscription},
};

// ==================== collect ====================

/// Gathers every value into `C`.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::from_iter([1, 2, 3])
///   .collect::<Vec<_>>()
///   .subscribe(|v| assert_eq!(v, vec![1, 2, 3]));
/// ```
pub struct CollectOp<S, C> {
  source: S,
  _collection: PhantomData<fn() -> C>,
}

impl<S: Clone, C> Clone for CollectOp<S, C> {
  fn clone(&self) -> Self { CollectOp::new(self.source.clone()) }
}

impl<S, C> CollectOp<S, C> {
  pub(crate) fn new(source: S) -> Self { CollectOp { source, _collection: PhantomData } }
}

impl<S: ObservableType, C> ObservableType for CollectOp<S, C> {
  type Item = C;
  type Err = S::Err;
}

impl<S, C, O> CoreObservable<O> for CollectOp<S, C>
where
  S: CoreObservable<CollectObserver<O, C>>,
  C: Default + Extend<S::Item>,
  O: Observer<C, S::Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(CollectObserver { observer, collection: C::default() })
  }
}

pub struct CollectObserver<O, C> {
  observer: O,
  collection: C,
}

impl<O, C, Item, Err> Observer<Item, Err> for CollectObserver<O, C>
where
  O: Observer<C, Err>,
  C: Extend<Item>,
{
  fn next(&mut self, value: Item) { self.collection.extend(Some(value)) }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(mut self) {
    self.observer.next(self.collection);
    self.observer.complete();
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

// ==================== to_map ====================

/// Gathers into a `HashMap`, failing on the first repeated key.
pub struct ToMapOp<S, KF, VF, Key> {
  source: S,
  key: KF,
  value: VF,
  _key: PhantomData<fn() -> Key>,
}

impl<S: Clone, KF: Clone, VF: Clone, Key> Clone for ToMapOp<S, KF, VF, Key> {
  fn clone(&self) -> Self { ToMapOp::new(self.source.clone(), self.key.clone(), self.value.clone()) }
}

impl<S, KF, VF, Key> ToMapOp<S, KF, VF, Key> {
  pub(crate) fn new(source: S, key: KF, value: VF) -> Self {
    ToMapOp { source, key, value, _key: PhantomData }
  }
}

impl<S, KF, VF, Key, V> ObservableType for ToMapOp<S, KF, VF, Key>
where
  S: ObservableType,
  VF: FnMut(S::Item) -> V,
{
  type Item = HashMap<Key, V>;
  type Err = S::Err;
}

impl<S, KF, VF, Key, V, O, Item, Err> CoreObservable<O> for ToMapOp<S, KF, VF, Key>
where
  S: ObservableType<Item = Item, Err = Err> + CoreObservable<ToMapObserver<O, KF, VF, Key, V>>,
  S::Unsub: Send + 'static,
  KF: FnMut(&Item) -> Key,
  VF: FnMut(Item) -> V,
  Key: Hash + Eq,
  Err: From<RxError>,
  O: Observer<HashMap<Key, V>, Err>,
{
  type Unsub = SingleAssignmentSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let upstream = SingleAssignmentSubscription::new();
    let observer = ToMapObserver {
      observer: Some(observer),
      key: self.key,
      value: self.value,
      map: HashMap::new(),
      upstream: upstream.clone(),
    };
    upstream.assign(self.source.actual_subscribe(observer));
    upstream
  }
}

pub struct ToMapObserver<O, KF, VF, Key, V> {
  observer: Option<O>,
  key: KF,
  value: VF,
  map: HashMap<Key, V>,
  upstream: SingleAssignmentSubscription,
}

impl<O, KF, VF, Key, V, Item, Err> Observer<Item, Err> for ToMapObserver<O, KF, VF, Key, V>
where
  KF: FnMut(&Item) -> Key,
  VF: FnMut(Item) -> V,
  Key: Hash + Eq,
  Err: From<RxError>,
  O: Observer<HashMap<Key, V>, Err>,
{
  fn next(&mut self, item: Item) {
    if self.observer.is_none() {
      return;
    }
    let key = (self.key)(&item);
    match self.map.entry(key) {
      Entry::Vacant(slot) => {
        slot.insert((self.value)(item));
      }
      Entry::Occupied(_) => {
        self.observer.take().error(RxError::DuplicateKey.into());
        self.upstream.clone().unsubscribe();
      }
    }
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(self) {
    if let Some(mut observer) = self.observer {
      observer.next(self.map);
      observer.complete();
    }
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

// ==================== to_lookup ====================

/// Gathers into a `HashMap` of every value per key, in arrival order.
pub struct ToLookupOp<S, KF, VF, Key> {
  source: S,
  key: KF,
  value: VF,
  _key: PhantomData<fn() -> Key>,
}

impl<S: Clone, KF: Clone, VF: Clone, Key> Clone for ToLookupOp<S, KF, VF, Key> {
  fn clone(&self) -> Self {
    ToLookupOp::new(self.source.clone(), self.key.clone(), self.value.clone())
  }
}

impl<S, KF, VF, Key> ToLookupOp<S, KF, VF, Key> {
  pub(crate) fn new(source: S, key: KF, value: VF) -> Self {
    ToLookupOp { source, key, value, _key: PhantomData }
  }
}

impl<S, KF, VF, Key, V> ObservableType for ToLookupOp<S, KF, VF, Key>
where
  S: ObservableType,
  VF: FnMut(S::Item) -> V,
{
  type Item = HashMap<Key, Vec<V>>;
  type Err = S::Err;
}

impl<S, KF, VF, Key, V, O, Item, Err> CoreObservable<O> for ToLookupOp<S, KF, VF, Key>
where
  S: ObservableType<Item = Item, Err = Err> + CoreObservable<ToLookupObserver<O, KF, VF, Key, V>>,
  KF: FnMut(&Item) -> Key,
  VF: FnMut(Item) -> V,
  Key: Hash + Eq,
  O: Observer<HashMap<Key, Vec<V>>, Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let observer =
      ToLookupObserver { observer, key: self.key, value: self.value, lookup: HashMap::new() };
    self.source.actual_subscribe(observer)
  }
}

pub struct ToLookupObserver<O, KF, VF, Key, V> {
  observer: O,
  key: KF,
  value: VF,
  lookup: HashMap<Key, Vec<V>>,
}

impl<O, KF, VF, Key, V, Item, Err> Observer<Item, Err> for ToLookupObserver<O, KF, VF, Key, V>
where
  KF: FnMut(&Item) -> Key,
  VF: FnMut(Item) -> V,
  Key: Hash + Eq,
  O: Observer<HashMap<Key, Vec<V>>, Err>,
{
  fn next(&mut self, item: Item) {
    let key = (self.key)(&item);
    self.lookup.entry(key).or_default().push((self.value)(item));
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(mut self) {
    self.observer.next(self.lookup);
    self.observer.complete();
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

#[cfg(test)]
mod test {
  use std::{collections::HashMap, sync::Arc};

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn collect_into_vec_and_string() {
    let v = Arc::new(Mutex::new(None));
    let c_v = v.clone();
    observable::from_iter(0..4).collect::<Vec<_>>().subscribe(move |c| *c_v.lock() = Some(c));
    assert_eq!(*v.lock(), Some(vec![0, 1, 2, 3]));

    let s = Arc::new(Mutex::new(String::new()));
    let c_s = s.clone();
    observable::from_iter("abc".chars()).collect::<String>().subscribe(move |c| *c_s.lock() = c);
    assert_eq!(*s.lock(), "abc");
  }

  #[test]
  fn collect_empty_emits_empty() {
    let v = Arc::new(Mutex::new(None));
    let c_v = v.clone();
    observable::empty::<i32>().collect::<Vec<_>>().subscribe(move |c| *c_v.lock() = Some(c));
    assert_eq!(*v.lock(), Some(vec![]));
  }

  #[test]
  fn to_map_by_key() {
    let map = Arc::new(Mutex::new(HashMap::new()));
    let c_map = map.clone();
    observable::from_iter(vec!["a", "bb", "ccc"])
      .fallible::<RxError>()
      .to_map(|s| s.len(), |s| s.to_uppercase())
      .subscribe_all(move |m| *c_map.lock() = m, |_| unreachable!(), || {});
    assert_eq!(map.lock()[&2], "BB");
    assert_eq!(map.lock().len(), 3);
  }

  #[test]
  fn to_map_duplicate_key_fails() {
    let mut subject = Subject::<i32, RxError>::default();
    let err = Arc::new(Mutex::new(None));
    let c_err = err.clone();
    subject
      .clone()
      .to_map(|v| v % 2, |v| v)
      .subscribe_all(|_| unreachable!(), move |e| *c_err.lock() = Some(e), || unreachable!());
    subject.next(1);
    subject.next(2);
    subject.next(3);
    assert_eq!(*err.lock(), Some(RxError::DuplicateKey));
    assert_eq!(subject.observer_count(), 0);
  }

  #[test]
  fn to_lookup_keeps_arrival_order() {
    let lookup = Arc::new(Mutex::new(HashMap::new()));
    let c_lookup = lookup.clone();
    observable::from_iter(1..=6)
      .to_lookup(|v| v % 3, |v| v * 10)
      .subscribe(move |m| *c_lookup.lock() = m);
    assert_eq!(lookup.lock()[&0], vec![30, 60]);
    assert_eq!(lookup.lock()[&1], vec![10, 40]);
  }
}
