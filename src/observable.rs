//! Observable traits and the source constructors.
//!
//! The subscription contract is split in three:
//!
//! - [`ObservableType`] names what a sequence carries (`Item`, `Err`);
//! - [`CoreObservable`] is the one narrow interface every source and operator
//!   implements: `actual_subscribe(observer) -> Unsub`;
//! - [`Observable`] is the user-facing extension trait with every operator
//!   method, blanket-implemented for all observable types.
//!
//! Observables are plain values. Subscribing consumes one; clone it to
//! subscribe again.

use std::convert::Infallible;

use crate::{
  blocking::{BlockingIter, PullMode, PullObserver},
  function::{Fallible, Identity, Total},
  observer::{FnMutObserver, Observer, ObserverAll, SafeObserver},
  ops::{
    catch::CatchOp,
    collect::{CollectOp, ToLookupOp, ToMapOp},
    combine_latest::CombineLatestWithOp,
    delay_subscription::DelaySubscriptionOp,
    filter::FilterOp,
    group_by::{GroupByOp, GroupedObservable},
    group_by_until::GroupByUntilOp,
    map::MapOp,
    map_err::MapErrOp,
    merge::MergeOp,
    merge_all::MergeAllOp,
    order_by::{Direction, OrderByOp},
    retry::{RetryOp, RetryPolicy},
    scan::{ReduceOp, ScanOp},
    take::{TakeForOp, TakeOp},
    take_last::{TakeLastBufferForOp, TakeLastBufferOp, TakeLastOp},
  },
  scheduler::{Duration, Scheduler},
  subscription::SingleAssignmentSubscription,
};

/// The observer a blocking iterator subscribes to `S` with.
pub type Pull<S> = PullObserver<<S as ObservableType>::Item, <S as ObservableType>::Err>;

mod boxed;
mod create;
mod defer;
mod from_iter;
mod of;
mod timer;

pub use boxed::*;
pub use create::*;
pub use defer::*;
pub use from_iter::*;
pub use of::*;
pub use timer::*;

pub use crate::ops::{
  combine_latest::{combine_latest_all, try_combine_latest_all},
  fallback::{catch_all, on_error_resume_next},
};

/// What a sequence carries.
pub trait ObservableType {
  type Item;
  type Err;
}

/// The subscription entry point every source and operator implements.
pub trait CoreObservable<O>: ObservableType {
  /// Handle that cancels the subscription.
  type Unsub: crate::subscription::Subscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub;
}

/// Operator methods available on every observable.
pub trait Observable: ObservableType + Sized {
  // ==================== Subscribing ====================

  /// Subscribe with a `next` handler. Only sequences that cannot fail accept
  /// this form; use [`subscribe_all`](Observable::subscribe_all) otherwise.
  fn subscribe<F>(self, next: F) -> <Self as CoreObservable<FnMutObserver<F>>>::Unsub
  where
    F: FnMut(Self::Item),
    Self: CoreObservable<FnMutObserver<F>>,
  {
    self.actual_subscribe(FnMutObserver(next))
  }

  /// Subscribe with a handler for every event.
  fn subscribe_all<N, E, C>(
    self, next: N, error: E, complete: C,
  ) -> <Self as CoreObservable<ObserverAll<N, E, C>>>::Unsub
  where
    N: FnMut(Self::Item),
    E: FnOnce(Self::Err),
    C: FnOnce(),
    Self: CoreObservable<ObserverAll<N, E, C>>,
  {
    self.actual_subscribe(ObserverAll { next, error, complete })
  }

  /// Subscribe a concrete observer.
  fn subscribe_with<O>(self, observer: O) -> <Self as CoreObservable<O>>::Unsub
  where
    O: Observer<Self::Item, Self::Err>,
    Self: CoreObservable<O>,
  {
    self.actual_subscribe(observer)
  }

  /// Subscribe an untrusted observer: a panic raised by it disposes the
  /// upstream subscription before unwinding further.
  fn subscribe_safe<O>(self, observer: O) -> SingleAssignmentSubscription
  where
    O: Observer<Self::Item, Self::Err>,
    Self: CoreObservable<SafeObserver<O>>,
    <Self as CoreObservable<SafeObserver<O>>>::Unsub: Send + 'static,
  {
    let upstream = SingleAssignmentSubscription::new();
    let unsub = self.actual_subscribe(SafeObserver::new(observer, upstream.clone()));
    upstream.assign(unsub);
    upstream
  }

  /// Erase the concrete type.
  fn box_it(self) -> BoxOp<Self::Item, Self::Err>
  where
    Self: DynCoreObservable<<Self as ObservableType>::Item, <Self as ObservableType>::Err> + 'static,
  {
    BoxOp::new(self)
  }

  // ==================== Transforming ====================

  fn map<B, F>(self, f: F) -> MapOp<Self, Total<F>>
  where
    F: FnMut(Self::Item) -> B,
  {
    MapOp::new(self, Total(f))
  }

  /// Like [`map`](Observable::map), but the selector may fail; a failure
  /// becomes the sequence's error.
  fn try_map<B, F>(self, f: F) -> MapOp<Self, Fallible<F>>
  where
    F: FnMut(Self::Item) -> Result<B, Self::Err>,
  {
    MapOp::new(self, Fallible(f))
  }

  fn filter<F>(self, f: F) -> FilterOp<Self, F>
  where
    F: FnMut(&Self::Item) -> bool,
  {
    FilterOp::new(self, f)
  }

  fn map_err<E, F>(self, f: F) -> MapErrOp<Self, F>
  where
    F: FnMut(Self::Err) -> E,
  {
    MapErrOp::new(self, f)
  }

  /// Reinterpret a sequence that cannot fail as one failing with `E`.
  fn fallible<E>(self) -> MapErrOp<Self, fn(Infallible) -> E>
  where
    Self: ObservableType<Err = Infallible>,
  {
    MapErrOp::new(self, absurd::<E> as fn(Infallible) -> E)
  }

  /// Emit every intermediate accumulation.
  fn scan<Acc, F>(self, seed: Acc, f: F) -> ScanOp<Self, F, Acc>
  where
    F: FnMut(Acc, Self::Item) -> Acc,
    Acc: Clone,
  {
    ScanOp::new(self, seed, f)
  }

  /// Fold without a seed and emit the result on completion. An empty source
  /// fails with [`RxError::EmptySequence`](crate::error::RxError).
  fn reduce<F>(self, f: F) -> ReduceOp<Self, F>
  where
    F: FnMut(Self::Item, Self::Item) -> Self::Item,
  {
    ReduceOp::new(self, f)
  }

  // ==================== Combining ====================

  /// Interleave the values of two sequences; complete when both did.
  fn merge<S>(self, other: S) -> MergeOp<Self, S>
  where
    S: ObservableType<Item = Self::Item, Err = Self::Err>,
  {
    MergeOp::new(self, other)
  }

  /// Flatten a sequence of sequences, running at most `max_concurrent` inner
  /// subscriptions at once (`usize::MAX` for no limit). Extra inners queue in
  /// arrival order.
  fn merge_all(self, max_concurrent: usize) -> MergeAllOp<Self>
  where
    Self::Item: ObservableType<Err = Self::Err>,
  {
    MergeAllOp::new(self, max_concurrent)
  }

  /// Flatten one inner sequence at a time, in order.
  fn concat_all(self) -> MergeAllOp<Self>
  where
    Self::Item: ObservableType<Err = Self::Err>,
  {
    MergeAllOp::new(self, 1)
  }

  fn flat_map<Inner, F>(self, f: F) -> MergeAllOp<MapOp<Self, Total<F>>>
  where
    F: FnMut(Self::Item) -> Inner,
    Inner: ObservableType<Err = Self::Err>,
  {
    MergeAllOp::new(self.map(f), usize::MAX)
  }

  fn concat_map<Inner, F>(self, f: F) -> MergeAllOp<MapOp<Self, Total<F>>>
  where
    F: FnMut(Self::Item) -> Inner,
    Inner: ObservableType<Err = Self::Err>,
  {
    MergeAllOp::new(self.map(f), 1)
  }

  /// Combine the latest value of both sequences whenever either emits, once
  /// both have emitted.
  fn combine_latest<S, F, Out>(self, other: S, f: F) -> CombineLatestWithOp<Self, S, F>
  where
    S: ObservableType<Err = Self::Err>,
    F: FnMut(Self::Item, S::Item) -> Out,
  {
    CombineLatestWithOp::new(self, other, f)
  }

  // ==================== Grouping ====================

  /// Split the sequence into one [`GroupedObservable`] per key.
  fn group_by<Key, F>(self, key: F) -> GroupByOp<Self, Total<F>, Identity, Key>
  where
    F: FnMut(&Self::Item) -> Key,
  {
    GroupByOp::new(self, Total(key), Identity)
  }

  /// `group_by` that also maps each element before it enters its group.
  fn group_by_with<Key, Elem, KF, EF>(
    self, key: KF, element: EF,
  ) -> GroupByOp<Self, Total<KF>, Total<EF>, Key>
  where
    KF: FnMut(&Self::Item) -> Key,
    EF: FnMut(Self::Item) -> Elem,
  {
    GroupByOp::new(self, Total(key), Total(element))
  }

  /// `group_by` with a key selector that may fail. A failure errors every
  /// open group and the outer sequence.
  fn try_group_by<Key, F>(self, key: F) -> GroupByOp<Self, Fallible<F>, Identity, Key>
  where
    F: FnMut(&Self::Item) -> Result<Key, Self::Err>,
  {
    GroupByOp::new(self, Fallible(key), Identity)
  }

  /// `group_by` where each group lives until the observable returned by
  /// `duration` for it emits or completes. A later element with the same key
  /// opens a fresh group.
  fn group_by_until<Key, F, D, Dur>(
    self, key: F, duration: D,
  ) -> GroupByUntilOp<Self, Total<F>, Identity, D, Key>
  where
    F: FnMut(&Self::Item) -> Key,
    D: FnMut(&GroupedObservable<Key, Self::Item, Self::Err>) -> Dur,
  {
    GroupByUntilOp::new(self, Total(key), Identity, duration)
  }

  // ==================== Error handling ====================

  /// On error, ask `handler` for a fallback sequence and continue with it.
  /// Returning `Err` from the handler fails the sequence with that error.
  fn catch<R, H>(self, handler: H) -> CatchOp<Self, H>
  where
    H: FnOnce(Self::Err) -> Result<R, Self::Err>,
    R: ObservableType<Item = Self::Item, Err = Self::Err>,
  {
    CatchOp::new(self, handler)
  }

  /// Resubscribe after an error while `policy` allows it.
  fn retry<P>(self, policy: P) -> RetryOp<Self, P>
  where
    P: RetryPolicy<Self::Err>,
  {
    RetryOp::new(self, policy)
  }

  // ==================== Taking ====================

  /// Emit the first `count` values, then complete and dispose upstream.
  fn take(self, count: usize) -> TakeOp<Self> { TakeOp::new(self, count) }

  /// Mirror the source until `duration` elapses on `scheduler`, then
  /// complete.
  fn take_for<Sch: Scheduler>(self, duration: Duration, scheduler: Sch) -> TakeForOp<Self, Sch> {
    TakeForOp::new(self, duration, scheduler)
  }

  /// On completion, emit the last `count` values.
  fn take_last(self, count: usize) -> TakeLastOp<Self> { TakeLastOp::new(self, count) }

  /// On completion, emit the last `count` values as one `Vec`.
  fn take_last_buffer(self, count: usize) -> TakeLastBufferOp<Self> {
    TakeLastBufferOp::new(self, count)
  }

  /// On completion, emit the values that arrived within the final
  /// `duration` as one `Vec`.
  fn take_last_buffer_for<Sch: Scheduler>(
    self, duration: Duration, scheduler: Sch,
  ) -> TakeLastBufferForOp<Self, Sch> {
    TakeLastBufferForOp::new(self, duration, scheduler)
  }

  /// Subscribe to the source only after `delay` on `scheduler`.
  fn delay_subscription<Sch: Scheduler>(
    self, delay: Duration, scheduler: Sch,
  ) -> DelaySubscriptionOp<Self, Sch> {
    DelaySubscriptionOp::new(self, delay, scheduler)
  }

  // ==================== Aggregating ====================

  /// Emit every value on completion, ordered by key. Equal keys keep arrival
  /// order.
  fn order_by<Key, F>(self, key: F) -> OrderByOp<Self, F, Key>
  where
    F: FnMut(&Self::Item) -> Key,
    Key: Ord,
  {
    OrderByOp::new(self, key, Direction::Ascending)
  }

  fn order_by_desc<Key, F>(self, key: F) -> OrderByOp<Self, F, Key>
  where
    F: FnMut(&Self::Item) -> Key,
    Key: Ord,
  {
    OrderByOp::new(self, key, Direction::Descending)
  }

  /// Gather every value into `C` and emit it on completion.
  fn collect<C>(self) -> CollectOp<Self, C>
  where
    C: Default + Extend<Self::Item>,
  {
    CollectOp::new(self)
  }

  /// Gather into a `HashMap`. A repeated key fails with
  /// [`RxError::DuplicateKey`](crate::error::RxError).
  fn to_map<Key, V, KF, VF>(self, key: KF, value: VF) -> ToMapOp<Self, KF, VF, Key>
  where
    KF: FnMut(&Self::Item) -> Key,
    VF: FnMut(Self::Item) -> V,
  {
    ToMapOp::new(self, key, value)
  }

  /// Gather into a `HashMap` of `Vec`s, one per key.
  fn to_lookup<Key, V, KF, VF>(self, key: KF, value: VF) -> ToLookupOp<Self, KF, VF, Key>
  where
    KF: FnMut(&Self::Item) -> Key,
    VF: FnMut(Self::Item) -> V,
  {
    ToLookupOp::new(self, key, value)
  }

  // ==================== Blocking ====================

  /// Blocking iterator over the most recent value: each call to `next`
  /// waits until a value not yet returned is available and returns the
  /// latest one, skipping any that were overwritten.
  fn latest(self) -> BlockingIter<Self::Item, Self::Err>
  where
    Self: CoreObservable<Pull<Self>>,
    <Self as CoreObservable<Pull<Self>>>::Unsub: Send + 'static,
  {
    BlockingIter::subscribe(self, PullMode::Latest)
  }

  /// Blocking iterator that waits for the next value produced *after* each
  /// call to `next`; values produced while nobody waits are dropped.
  fn next_values(self) -> BlockingIter<Self::Item, Self::Err>
  where
    Self: CoreObservable<Pull<Self>>,
    <Self as CoreObservable<Pull<Self>>>::Unsub: Send + 'static,
  {
    BlockingIter::subscribe(self, PullMode::Next)
  }
}

impl<T: ObservableType> Observable for T {}

fn absurd<E>(never: Infallible) -> E { match never {} }
