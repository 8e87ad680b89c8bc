//! Operators that hold back values until the source completes.
//!
//! All three keep a bounded FIFO of the newest values and flush it on
//! completion. An error discards the buffer and passes through.

use std::collections::VecDeque;

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  scheduler::{Duration, Scheduler, Stopwatch},
};

/// Drop-oldest buffer of at most `capacity` values.
struct Window<T> {
  capacity: usize,
  queue: VecDeque<T>,
}

impl<T> Window<T> {
  fn new(capacity: usize) -> Self {
    Window { capacity, queue: VecDeque::with_capacity(capacity.min(64)) }
  }

  fn push(&mut self, value: T) {
    if self.capacity == 0 {
      return;
    }
    if self.queue.len() == self.capacity {
      self.queue.pop_front();
    }
    self.queue.push_back(value);
  }
}

// ==================== take_last(count) ====================

#[derive(Clone)]
pub struct TakeLastOp<S> {
  source: S,
  count: usize,
}

impl<S> TakeLastOp<S> {
  pub(crate) fn new(source: S, count: usize) -> Self { TakeLastOp { source, count } }
}

impl<S: ObservableType> ObservableType for TakeLastOp<S> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, O, Item, Err> CoreObservable<O> for TakeLastOp<S>
where
  S: ObservableType<Item = Item, Err = Err> + CoreObservable<TakeLastObserver<O, Item>>,
  O: Observer<Item, Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self
      .source
      .actual_subscribe(TakeLastObserver { observer, window: Window::new(self.count) })
  }
}

pub struct TakeLastObserver<O, Item> {
  observer: O,
  window: Window<Item>,
}

impl<O, Item, Err> Observer<Item, Err> for TakeLastObserver<O, Item>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.window.push(value) }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(mut self) {
    for value in self.window.queue.drain(..) {
      if self.observer.is_closed() {
        return;
      }
      self.observer.next(value);
    }
    self.observer.complete();
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

// ==================== take_last_buffer(count) ====================

#[derive(Clone)]
pub struct TakeLastBufferOp<S> {
  source: S,
  count: usize,
}

impl<S> TakeLastBufferOp<S> {
  pub(crate) fn new(source: S, count: usize) -> Self { TakeLastBufferOp { source, count } }
}

impl<S: ObservableType> ObservableType for TakeLastBufferOp<S> {
  type Item = Vec<S::Item>;
  type Err = S::Err;
}

impl<S, O, Item, Err> CoreObservable<O> for TakeLastBufferOp<S>
where
  S: ObservableType<Item = Item, Err = Err> + CoreObservable<TakeLastBufferObserver<O, Item>>,
  O: Observer<Vec<Item>, Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self
      .source
      .actual_subscribe(TakeLastBufferObserver { observer, window: Window::new(self.count) })
  }
}

pub struct TakeLastBufferObserver<O, Item> {
  observer: O,
  window: Window<Item>,
}

impl<O, Item, Err> Observer<Item, Err> for TakeLastBufferObserver<O, Item>
where
  O: Observer<Vec<Item>, Err>,
{
  fn next(&mut self, value: Item) { self.window.push(value) }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(mut self) {
    self.observer.next(self.window.queue.into());
    self.observer.complete();
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

// ==================== take_last_buffer_for(duration) ====================

/// Emits, on completion, the values that arrived within the final
/// `duration`, measured on the scheduler's clock.
#[derive(Clone)]
pub struct TakeLastBufferForOp<S, Sch> {
  source: S,
  duration: Duration,
  scheduler: Sch,
}

impl<S, Sch> TakeLastBufferForOp<S, Sch> {
  pub(crate) fn new(source: S, duration: Duration, scheduler: Sch) -> Self {
    TakeLastBufferForOp { source, duration, scheduler }
  }
}

impl<S: ObservableType, Sch> ObservableType for TakeLastBufferForOp<S, Sch> {
  type Item = Vec<S::Item>;
  type Err = S::Err;
}

impl<S, Sch, O, Item, Err> CoreObservable<O> for TakeLastBufferForOp<S, Sch>
where
  S: ObservableType<Item = Item, Err = Err>,
  S: CoreObservable<TakeLastBufferForObserver<O, Item, Sch>>,
  Sch: Scheduler,
  O: Observer<Vec<Item>, Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let observer = TakeLastBufferForObserver {
      observer,
      duration: self.duration,
      stopwatch: self.scheduler.stopwatch(),
      queue: VecDeque::new(),
    };
    self.source.actual_subscribe(observer)
  }
}

pub struct TakeLastBufferForObserver<O, Item, Sch> {
  observer: O,
  duration: Duration,
  stopwatch: Stopwatch<Sch>,
  queue: VecDeque<(Duration, Item)>,
}

impl<O, Item, Sch: Scheduler> TakeLastBufferForObserver<O, Item, Sch> {
  fn trim(&mut self, now: Duration) {
    while self
      .queue
      .front()
      .is_some_and(|(at, _)| now.saturating_sub(*at) >= self.duration)
    {
      self.queue.pop_front();
    }
  }
}

impl<O, Item, Err, Sch> Observer<Item, Err> for TakeLastBufferForObserver<O, Item, Sch>
where
  O: Observer<Vec<Item>, Err>,
  Sch: Scheduler,
{
  fn next(&mut self, value: Item) {
    let now = self.stopwatch.elapsed();
    self.queue.push_back((now, value));
    self.trim(now);
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(mut self) {
    let now = self.stopwatch.elapsed();
    self.trim(now);
    let values = self.queue.drain(..).map(|(_, v)| v).collect();
    self.observer.next(values);
    self.observer.complete();
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}
