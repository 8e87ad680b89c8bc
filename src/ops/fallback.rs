//! Sequential fallback over a series of sources.
//!
//! `catch_all`, `on_error_resume_next` and `retry` all subscribe one source
//! at a time and decide, when it terminates, whether to move on to the next
//! source or to terminate downstream. The decision is a [`FallbackMode`];
//! the subscription loop is shared.
//!
//! Moving on is trampolined. A source that terminates synchronously while it
//! is being subscribed only sets `pending`; the loop that subscribed it then
//! takes the next source itself. Long chains of synchronous sources run in
//! constant stack depth.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  subscription::{SerialSubscription, SingleAssignmentSubscription, Subscription},
};

/// What to do when the current source terminates.
pub trait FallbackMode<Err> {
  /// A value passed through.
  fn on_next(&mut self) {}

  /// `Ok` moves on to the next source, `Err` fails downstream.
  fn on_error(&mut self, err: Err) -> Result<(), Err>;

  /// `true` moves on to the next source, `false` completes downstream.
  fn on_complete(&mut self) -> bool;

  /// No source left: `Some` fails downstream, `None` completes it.
  fn on_exhausted(&mut self) -> Option<Err>;
}

/// Move on after an error; re-raise the last error if every source failed.
pub struct CatchMode<Err> {
  last: Option<Err>,
}

impl<Err> FallbackMode<Err> for CatchMode<Err> {
  fn on_error(&mut self, err: Err) -> Result<(), Err> {
    debug!("catch_all: source failed, trying the next one");
    self.last = Some(err);
    Ok(())
  }

  fn on_complete(&mut self) -> bool { false }

  fn on_exhausted(&mut self) -> Option<Err> { self.last.take() }
}

/// Move on after either terminal; complete once every source is used.
pub struct ResumeNextMode;

impl<Err> FallbackMode<Err> for ResumeNextMode {
  fn on_error(&mut self, _: Err) -> Result<(), Err> {
    debug!("on_error_resume_next: source failed, advancing");
    Ok(())
  }

  fn on_complete(&mut self) -> bool { true }

  fn on_exhausted(&mut self) -> Option<Err> { None }
}

/// Continue with the first source that does not fail.
///
/// Every source is tried in order; the sequence fails with the error of the
/// last source if all of them fail, and completes when one completes.
///
/// ```
/// use rxcore::prelude::*;
///
/// let sources = vec![
///   observable::throw_err("first").box_it(),
///   observable::of(1).fallible().box_it(),
/// ];
/// observable::catch_all(sources).subscribe_all(
///   |v| assert_eq!(v, 1),
///   |_: &str| unreachable!(),
///   || {},
/// );
/// ```
pub fn catch_all<I>(sources: I) -> FallbackOp<I::IntoIter, CatchMode<<I::Item as ObservableType>::Err>>
where
  I: IntoIterator,
  I::Item: ObservableType,
{
  FallbackOp { sources: sources.into_iter(), mode: CatchMode { last: None } }
}

/// Concatenate `sources`, treating an error like a completion.
pub fn on_error_resume_next<I>(sources: I) -> FallbackOp<I::IntoIter, ResumeNextMode>
where
  I: IntoIterator,
  I::Item: ObservableType,
{
  FallbackOp { sources: sources.into_iter(), mode: ResumeNextMode }
}

#[derive(Clone)]
pub struct FallbackOp<I, M> {
  sources: I,
  mode: M,
}

impl<I, M> FallbackOp<I, M> {
  pub(crate) fn new(sources: I, mode: M) -> Self { FallbackOp { sources, mode } }
}

impl<I, M> ObservableType for FallbackOp<I, M>
where
  I: Iterator,
  I::Item: ObservableType,
{
  type Item = <I::Item as ObservableType>::Item;
  type Err = <I::Item as ObservableType>::Err;
}

struct FallbackState<I, O, M> {
  sources: I,
  observer: Option<O>,
  mode: M,
  /// Bumped for every subscribed source; events of older sources are stale.
  generation: usize,
  looping: bool,
  pending: bool,
}

pub struct FallbackShared<I, O, M> {
  state: Arc<Mutex<FallbackState<I, O, M>>>,
  serial: SerialSubscription,
  /// `advance` instantiated where the sources' subscribe bounds are known.
  advance: fn(&FallbackShared<I, O, M>),
}

impl<I, O, M> Clone for FallbackShared<I, O, M> {
  fn clone(&self) -> Self {
    FallbackShared { state: self.state.clone(), serial: self.serial.clone(), advance: self.advance }
  }
}

impl<I, M, O, S> CoreObservable<O> for FallbackOp<I, M>
where
  I: Iterator<Item = S>,
  S: CoreObservable<FallbackObserver<I, O, M>>,
  S::Unsub: Send + 'static,
  M: FallbackMode<S::Err>,
  O: Observer<S::Item, S::Err>,
{
  type Unsub = SerialSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let shared = FallbackShared {
      state: Arc::new(Mutex::new(FallbackState {
        sources: self.sources,
        observer: Some(observer),
        mode: self.mode,
        generation: 0,
        looping: false,
        pending: false,
      })),
      serial: SerialSubscription::new(),
      advance: advance::<I, O, M, S>,
    };
    advance(&shared);
    shared.serial
  }
}

/// Subscribe the next source, or terminate downstream when there is none.
fn advance<I, O, M, S>(shared: &FallbackShared<I, O, M>)
where
  I: Iterator<Item = S>,
  S: CoreObservable<FallbackObserver<I, O, M>>,
  S::Unsub: Send + 'static,
  M: FallbackMode<S::Err>,
  O: Observer<S::Item, S::Err>,
{
  {
    let mut state = shared.state.lock();
    if state.looping {
      state.pending = true;
      return;
    }
    state.looping = true;
  }
  let _unwind = LoopGuard(shared);
  loop {
    let mut state = shared.state.lock();
    state.pending = false;
    if state.observer.is_none() || shared.serial.is_closed() {
      state.looping = false;
      return;
    }
    let Some(source) = state.sources.next() else {
      state.looping = false;
      let observer = state.observer.take();
      let err = state.mode.on_exhausted();
      drop(state);
      if let Some(observer) = observer {
        match err {
          Some(err) => observer.error(err),
          None => observer.complete(),
        }
      }
      return;
    };
    state.generation += 1;
    let generation = state.generation;
    drop(state);

    let slot = SingleAssignmentSubscription::new();
    shared.serial.set(slot.clone());
    slot.assign(source.actual_subscribe(FallbackObserver { shared: shared.clone(), generation }));

    let mut state = shared.state.lock();
    if !state.pending {
      state.looping = false;
      return;
    }
  }
}

/// Clears `looping` if subscribing a source panics, so later terminals can
/// still advance.
struct LoopGuard<'a, I, O, M>(&'a FallbackShared<I, O, M>);

impl<I, O, M> Drop for LoopGuard<'_, I, O, M> {
  fn drop(&mut self) {
    if std::thread::panicking() {
      self.0.state.lock().looping = false;
    }
  }
}

pub struct FallbackObserver<I, O, M> {
  shared: FallbackShared<I, O, M>,
  generation: usize,
}

impl<I, O, M> FallbackObserver<I, O, M> {
  fn is_current(&self, state: &FallbackState<I, O, M>) -> bool {
    state.generation == self.generation && state.observer.is_some()
  }
}

impl<I, O, M, Item, Err> Observer<Item, Err> for FallbackObserver<I, O, M>
where
  M: FallbackMode<Err>,
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    let mut state = self.shared.state.lock();
    if !self.is_current(&state) {
      return;
    }
    state.mode.on_next();
    if let Some(observer) = state.observer.as_mut() {
      observer.next(value);
    }
  }

  fn error(self, err: Err) {
    let mut state = self.shared.state.lock();
    if !self.is_current(&state) {
      return;
    }
    match state.mode.on_error(err) {
      Ok(()) => {
        drop(state);
        (self.shared.advance)(&self.shared);
      }
      Err(err) => {
        let observer = state.observer.take();
        drop(state);
        if let Some(observer) = observer {
          observer.error(err);
        }
      }
    }
  }

  fn complete(self) {
    let mut state = self.shared.state.lock();
    if !self.is_current(&state) {
      return;
    }
    if state.mode.on_complete() {
      drop(state);
      (self.shared.advance)(&self.shared);
    } else {
      let observer = state.observer.take();
      drop(state);
      if let Some(observer) = observer {
        observer.complete();
      }
    }
  }

  fn is_closed(&self) -> bool { self.shared.serial.is_closed() }
}
