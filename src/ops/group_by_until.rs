use std::{hash::Hash, marker::PhantomData};

use crate::{
  function::{KeySelector, Selector},
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  ops::group_by::{finish, get_or_create, GroupSink, GroupedObservable, Groups},
  producer,
  sink::{Sink, SinkHandle},
  subject::Subject,
  subscription::{CompositeSubscription, EntryId, RefCountSubscription, Subscription},
};

/// `group_by` where every group expires when its duration sequence first
/// emits or completes.
///
/// Duration subscriptions live in the source connection, so they keep
/// running after the outer subscription is disposed for as long as any group
/// is still subscribed. An expired key that shows up again opens a new group.
pub struct GroupByUntilOp<S, KF, EF, D, Key> {
  source: S,
  key: KF,
  element: EF,
  duration: D,
  _key: PhantomData<fn() -> Key>,
}

impl<S, KF, EF, D, Key> GroupByUntilOp<S, KF, EF, D, Key> {
  pub(crate) fn new(source: S, key: KF, element: EF, duration: D) -> Self {
    GroupByUntilOp { source, key, element, duration, _key: PhantomData }
  }
}

impl<S: Clone, KF: Clone, EF: Clone, D: Clone, Key> Clone for GroupByUntilOp<S, KF, EF, D, Key> {
  fn clone(&self) -> Self {
    GroupByUntilOp::new(
      self.source.clone(),
      self.key.clone(),
      self.element.clone(),
      self.duration.clone(),
    )
  }
}

impl<S, KF, EF, D, Key> ObservableType for GroupByUntilOp<S, KF, EF, D, Key>
where
  S: ObservableType,
  KF: KeySelector<S::Item, Key, S::Err>,
  EF: Selector<S::Item, S::Err>,
{
  type Item = GroupedObservable<Key, EF::Output, S::Err>;
  type Err = S::Err;
}

impl<S, KF, EF, D, Dur, Key, O, Item, Err> CoreObservable<O> for GroupByUntilOp<S, KF, EF, D, Key>
where
  S: ObservableType<Item = Item, Err = Err>,
  S: CoreObservable<GroupByUntilObserver<O, KF, EF, D, Key, EF::Output, Err>>,
  S::Unsub: Send + 'static,
  KF: KeySelector<Item, Key, Err>,
  EF: Selector<Item, Err>,
  EF::Output: Clone,
  D: FnMut(&GroupedObservable<Key, EF::Output, Err>) -> Dur,
  Dur: CoreObservable<DurationObserver<O, Key, EF::Output, Err>, Err = Err>,
  Dur::Unsub: Send + 'static,
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
    let observer = GroupByUntilObserver {
      sink: sink.clone(),
      key: self.key,
      element: self.element,
      duration: self.duration,
      ref_count,
      connection: connection.clone(),
    };
    producer::attach_to(self.source, &connection, |_| observer);
    sink.handle().clone()
  }
}

pub struct GroupByUntilObserver<O, KF, EF, D, Key, Elem, Err> {
  sink: GroupSink<O, Key, Elem, Err>,
  key: KF,
  element: EF,
  duration: D,
  ref_count: RefCountSubscription,
  connection: CompositeSubscription,
}

impl<O, KF, EF, D, Dur, Key, Item, Elem, Err> Observer<Item, Err>
  for GroupByUntilObserver<O, KF, EF, D, Key, Elem, Err>
where
  KF: KeySelector<Item, Key, Err>,
  EF: Selector<Item, Err, Output = Elem>,
  D: FnMut(&GroupedObservable<Key, Elem, Err>) -> Dur,
  Dur: CoreObservable<DurationObserver<O, Key, Elem, Err>, Err = Err>,
  Dur::Unsub: Send + 'static,
  Key: Hash + Eq + Clone,
  Elem: Clone,
  Err: Clone,
  O: Observer<GroupedObservable<Key, Elem, Err>, Err>,
{
  fn next(&mut self, value: Item) {
    let selected = self
      .key
      .key_of(&value)
      .and_then(|key| self.element.select(value).map(|element| (key, element)));
    let (key, element) = match selected {
      Ok(selected) => selected,
      Err(err) => {
        finish(&self.sink, Some(err));
        self.connection.clone().unsubscribe();
        return;
      }
    };
    let Some((mut subject, fresh)) = get_or_create(&self.sink, key, &self.ref_count) else {
      return;
    };
    if let Some(group) = fresh {
      let duration = (self.duration)(&group);
      let sink = self.sink.clone();
      let connection = self.connection.clone();
      producer::attach_to(duration, &self.connection, |id| DurationObserver {
        sink,
        key: group.key().clone(),
        subject: subject.clone(),
        connection,
        id,
        fired: false,
      });
    }
    subject.next(element);
  }

  fn error(self, err: Err) { finish(&self.sink, Some(err)) }

  fn complete(self) { finish(&self.sink, None) }

  fn is_closed(&self) -> bool { self.connection.is_closed() }
}

/// Watches the duration sequence of one group.
pub struct DurationObserver<O, Key, Elem, Err> {
  sink: GroupSink<O, Key, Elem, Err>,
  key: Key,
  subject: Subject<Elem, Err>,
  connection: CompositeSubscription,
  id: EntryId,
  fired: bool,
}

impl<O, Key, Elem, Err> DurationObserver<O, Key, Elem, Err>
where
  Key: Hash + Eq,
  Elem: Clone,
  Err: Clone,
{
  fn expire(&mut self) {
    if std::mem::replace(&mut self.fired, true) {
      return;
    }
    {
      let mut gate = self.sink.lock();
      let groups = &mut gate.state.map;
      // The key may already belong to a newer group.
      if groups.get(&self.key).is_some_and(|current| current.ptr_eq(&self.subject)) {
        groups.remove(&self.key);
      }
    }
    self.subject.clone().complete();
    self.connection.remove(self.id);
  }
}

impl<O, Key, Elem, Err, DItem> Observer<DItem, Err> for DurationObserver<O, Key, Elem, Err>
where
  Key: Hash + Eq,
  Elem: Clone,
  Err: Clone,
  O: Observer<GroupedObservable<Key, Elem, Err>, Err>,
{
  fn next(&mut self, _: DItem) { self.expire() }

  fn error(self, err: Err) {
    finish(&self.sink, Some(err));
    self.connection.clone().unsubscribe();
  }

  fn complete(mut self) { self.expire() }

  fn is_closed(&self) -> bool { self.fired || self.connection.is_closed() }
}
