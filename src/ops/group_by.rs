//! Keyed partitioning of a sequence into per-key subjects.
//!
//! The source subscription lives in a *connection* composite wrapped by a
//! [`RefCountSubscription`]. The downstream subscription holds the primary
//! handle and every subscribed group holds a guard, so the source stays
//! connected until the outer subscription and every group subscription are
//! gone. A group subscription gives its guard back on its own once the group
//! terminates. Elements keep being routed to open groups after the outer
//! subscription is disposed.

use std::{collections::HashMap, hash::Hash, marker::PhantomData};

use crate::{
  function::{KeySelector, Selector},
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  producer,
  sink::{Sink, SinkHandle},
  subject::{Subject, SubjectSubscription},
  subscription::{CompositeSubscription, RefCountGuard, RefCountSubscription, Subscription},
};

/// One group of a `group_by`: the key plus the sequence of its elements.
pub struct GroupedObservable<Key, Item, Err> {
  key: Key,
  subject: Subject<Item, Err>,
  ref_count: RefCountSubscription,
}

impl<Key, Item, Err> GroupedObservable<Key, Item, Err> {
  pub(crate) fn new(key: Key, subject: Subject<Item, Err>, ref_count: RefCountSubscription) -> Self {
    GroupedObservable { key, subject, ref_count }
  }

  pub fn key(&self) -> &Key { &self.key }
}

impl<Key: Clone, Item, Err> Clone for GroupedObservable<Key, Item, Err> {
  fn clone(&self) -> Self {
    GroupedObservable {
      key: self.key.clone(),
      subject: self.subject.clone(),
      ref_count: self.ref_count.clone(),
    }
  }
}

impl<Key, Item, Err> ObservableType for GroupedObservable<Key, Item, Err> {
  type Item = Item;
  type Err = Err;
}

impl<Key, Item, Err, O> CoreObservable<O> for GroupedObservable<Key, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: 'static,
  Err: Clone + 'static,
{
  type Unsub = (RefCountGuard, SubjectSubscription<Item, Err>);

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let guard = self.ref_count.guard();
    let observer = GroupObserver { observer, guard: guard.clone() };
    (guard, self.subject.actual_subscribe(observer))
  }
}

/// Forwards one group to its subscriber and gives back the connection guard
/// once the group terminates.
pub struct GroupObserver<O> {
  observer: O,
  guard: RefCountGuard,
}

impl<O, Item, Err> Observer<Item, Err> for GroupObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.observer.next(value) }

  fn error(self, err: Err) {
    self.observer.error(err);
    self.guard.unsubscribe();
  }

  fn complete(self) {
    self.observer.complete();
    self.guard.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

/// Open groups, shared by `group_by` and `group_by_until`.
pub struct Groups<Key, Elem, Err> {
  pub(crate) map: HashMap<Key, Subject<Elem, Err>>,
  pub(crate) stopped: bool,
}

impl<Key, Elem, Err> Default for Groups<Key, Elem, Err> {
  fn default() -> Self { Groups { map: HashMap::new(), stopped: false } }
}

pub(crate) type GroupSink<O, Key, Elem, Err> = Sink<O, Groups<Key, Elem, Err>>;

/// Look up the subject for `key`, creating it if needed. A fresh group is
/// emitted downstream, under the gate, before this returns. `None` once the
/// groups were terminated.
pub(crate) fn get_or_create<O, Key, Elem, Err>(
  sink: &GroupSink<O, Key, Elem, Err>, key: Key, ref_count: &RefCountSubscription,
) -> Option<(Subject<Elem, Err>, Option<GroupedObservable<Key, Elem, Err>>)>
where
  O: Observer<GroupedObservable<Key, Elem, Err>, Err>,
  Key: Hash + Eq + Clone,
{
  let mut gate = sink.lock();
  if gate.state.stopped {
    return None;
  }
  if let Some(subject) = gate.state.map.get(&key) {
    return Some((subject.clone(), None));
  }
  let subject = Subject::new();
  gate.state.map.insert(key.clone(), subject.clone());
  let group = GroupedObservable::new(key, subject.clone(), ref_count.clone());
  gate.next::<_, Err>(group.clone());
  Some((subject, Some(group)))
}

/// Terminate every open group and then downstream with the same event.
pub(crate) fn finish<O, Key, Elem, Err>(sink: &GroupSink<O, Key, Elem, Err>, err: Option<Err>)
where
  O: Observer<GroupedObservable<Key, Elem, Err>, Err>,
  Elem: Clone,
  Err: Clone,
{
  let (groups, observer) = {
    let mut gate = sink.lock();
    if gate.state.stopped {
      return;
    }
    gate.state.stopped = true;
    let groups: Vec<_> = gate.state.map.drain().map(|(_, subject)| subject).collect();
    (groups, gate.take_observer())
  };
  match err {
    Some(err) => {
      for group in groups {
        group.error(err.clone());
      }
      if let Some(observer) = observer {
        observer.error(err);
      }
    }
    None => {
      for group in groups {
        group.complete();
      }
      if let Some(observer) = observer {
        observer.complete();
      }
    }
  }
  sink.dispose();
}

pub struct GroupByOp<S, KF, EF, Key> {
  source: S,
  key: KF,
  element: EF,
  _key: PhantomData<fn() -> Key>,
}

impl<S: Clone, KF: Clone, EF: Clone, Key> Clone for GroupByOp<S, KF, EF, Key> {
  fn clone(&self) -> Self {
    GroupByOp {
      source: self.source.clone(),
      key: self.key.clone(),
      element: self.element.clone(),
      _key: PhantomData,
    }
  }
}

impl<S, KF, EF, Key> GroupByOp<S, KF, EF, Key> {
  pub(crate) fn new(source: S, key: KF, element: EF) -> Self {
    GroupByOp { source, key, element, _key: PhantomData }
  }
}

impl<S, KF, EF, Key> ObservableType for GroupByOp<S, KF, EF, Key>
where
  S: ObservableType,
  KF: KeySelector<S::Item, Key, S::Err>,
  EF: Selector<S::Item, S::Err>,
{
  type Item = GroupedObservable<Key, EF::Output, S::Err>;
  type Err = S::Err;
}

impl<S, KF, EF, Key, O, Item, Err> CoreObservable<O> for GroupByOp<S, KF, EF, Key>
where
  S: ObservableType<Item = Item, Err = Err>,
  S: CoreObservable<GroupByObserver<O, KF, EF, Key, EF::Output, Err>>,
  S::Unsub: Send + 'static,
  KF: KeySelector<Item, Key, Err>,
  EF: Selector<Item, Err>,
  EF::Output: Clone,
  Key: Hash + Eq + Clone,
  Err: Clone,
  O: Observer<GroupedObservable<Key, EF::Output, Err>, Err>,
{
  type Unsub = SinkHandle;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let connection = CompositeSubscription::new();
    let ref_count = RefCountSubscription::new(connection.clone());
    let sink = Sink::new(observer, Groups::default());
    sink.handle().install(ref_count.clone());
    let observer = GroupByObserver {
      sink: sink.clone(),
      key: self.key,
      element: self.element,
      ref_count,
      connection: connection.clone(),
    };
    producer::attach_to(self.source, &connection, |_| observer);
    sink.handle().clone()
  }
}

pub struct GroupByObserver<O, KF, EF, Key, Elem, Err> {
  sink: GroupSink<O, Key, Elem, Err>,
  key: KF,
  element: EF,
  ref_count: RefCountSubscription,
  connection: CompositeSubscription,
}

impl<O, KF, EF, Key, Elem, Err> GroupByObserver<O, KF, EF, Key, Elem, Err>
where
  O: Observer<GroupedObservable<Key, Elem, Err>, Err>,
  Elem: Clone,
  Err: Clone,
{
  fn fail(&self, err: Err) {
    finish(&self.sink, Some(err));
    self.connection.clone().unsubscribe();
  }
}

impl<O, KF, EF, Key, Item, Elem, Err> Observer<Item, Err> for GroupByObserver<O, KF, EF, Key, Elem, Err>
where
  KF: KeySelector<Item, Key, Err>,
  EF: Selector<Item, Err, Output = Elem>,
  Key: Hash + Eq + Clone,
  Elem: Clone,
  Err: Clone,
  O: Observer<GroupedObservable<Key, Elem, Err>, Err>,
{
  fn next(&mut self, value: Item) {
    let key = match self.key.key_of(&value) {
      Ok(key) => key,
      Err(err) => return self.fail(err),
    };
    let element = match self.element.select(value) {
      Ok(element) => element,
      Err(err) => return self.fail(err),
    };
    if let Some((mut subject, _)) = get_or_create(&self.sink, key, &self.ref_count) {
      subject.next(element);
    }
  }

  fn error(self, err: Err) { finish(&self.sink, Some(err)) }

  fn complete(self) { finish(&self.sink, None) }

  fn is_closed(&self) -> bool { self.connection.is_closed() }
}
