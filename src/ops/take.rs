use tracing::debug;

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  producer,
  scheduler::{Duration, Scheduler},
  sink::{Sink, SinkHandle},
  subscription::{SingleAssignmentSubscription, Subscription},
};

// ==================== take(count) ====================

/// Emits the first `count` values of the source.
///
/// After the last of them the operator completes and disposes the upstream
/// subscription, so a synchronous source stops producing at that point.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::from_iter(0..).take(3).subscribe(|v| println!("{v}"));
/// // 0
/// // 1
/// // 2
/// ```
#[derive(Clone)]
pub struct TakeOp<S> {
  source: S,
  count: usize,
}

impl<S> TakeOp<S> {
  pub(crate) fn new(source: S, count: usize) -> Self { TakeOp { source, count } }
}

impl<S: ObservableType> ObservableType for TakeOp<S> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, O> CoreObservable<O> for TakeOp<S>
where
  S: CoreObservable<TakeObserver<O>>,
  S::Unsub: Send + 'static,
  O: Observer<S::Item, S::Err>,
{
  type Unsub = SingleAssignmentSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let upstream = SingleAssignmentSubscription::new();
    if self.count == 0 {
      observer.complete();
      upstream.clone().unsubscribe();
      return upstream;
    }
    let observer =
      TakeObserver { observer: Some(observer), remaining: self.count, upstream: upstream.clone() };
    upstream.assign(self.source.actual_subscribe(observer));
    upstream
  }
}

pub struct TakeObserver<O> {
  observer: Option<O>,
  remaining: usize,
  upstream: SingleAssignmentSubscription,
}

impl<O, Item, Err> Observer<Item, Err> for TakeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    let Some(observer) = self.observer.as_mut() else {
      return;
    };
    self.remaining -= 1;
    observer.next(value);
    if self.remaining == 0 {
      if let Some(observer) = self.observer.take() {
        observer.complete();
      }
      self.upstream.clone().unsubscribe();
    }
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

// ==================== take_for(duration) ====================

/// Mirrors the source until a timer on the scheduler fires, then completes.
///
/// Values and the timer share the sink's gate, so a value racing the timer
/// is either delivered before the completion or not at all.
#[derive(Clone)]
pub struct TakeForOp<S, Sch> {
  source: S,
  duration: Duration,
  scheduler: Sch,
}

impl<S, Sch> TakeForOp<S, Sch> {
  pub(crate) fn new(source: S, duration: Duration, scheduler: Sch) -> Self {
    TakeForOp { source, duration, scheduler }
  }
}

impl<S: ObservableType, Sch> ObservableType for TakeForOp<S, Sch> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, Sch, O, Item, Err> CoreObservable<O> for TakeForOp<S, Sch>
where
  S: ObservableType<Item = Item, Err = Err> + CoreObservable<TakeForObserver<O>>,
  S::Unsub: Send + 'static,
  Sch: Scheduler,
  O: Observer<Item, Err> + Send + 'static,
{
  type Unsub = SinkHandle;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let sink = Sink::new(observer, ());
    let timer_sink = sink.clone();
    let timer = self.scheduler.schedule(
      Box::new(move || {
        debug!("take_for: duration elapsed, completing");
        timer_sink.complete::<Item, Err>();
      }),
      Some(self.duration),
    );
    let handle = sink.handle().clone();
    handle.install(timer);
    producer::run(self.source, TakeForObserver { sink }, handle)
  }
}

pub struct TakeForObserver<O> {
  sink: Sink<O>,
}

impl<O, Item, Err> Observer<Item, Err> for TakeForObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.sink.next::<Item, Err>(value) }

  fn error(self, err: Err) { self.sink.error::<Item, Err>(err) }

  fn complete(self) { self.sink.complete::<Item, Err>() }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}
