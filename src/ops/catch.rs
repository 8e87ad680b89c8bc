use tracing::debug;

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  subscription::{SerialSubscription, SingleAssignmentSubscription, Subscription},
};

/// Switches to a fallback sequence chosen by a handler when the source
/// fails.
///
/// The handler sees the error by value and either returns the fallback or
/// hands back an error, which then terminates downstream. Only the first
/// error is handled; errors of the fallback pass through.
#[derive(Clone)]
pub struct CatchOp<S, H> {
  source: S,
  handler: H,
}

impl<S, H> CatchOp<S, H> {
  pub(crate) fn new(source: S, handler: H) -> Self { CatchOp { source, handler } }
}

impl<S: ObservableType, H> ObservableType for CatchOp<S, H> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, H, R, O, Item, Err> CoreObservable<O> for CatchOp<S, H>
where
  S: ObservableType<Item = Item, Err = Err>,
  S: CoreObservable<CatchObserver<O, H>>,
  S::Unsub: Send + 'static,
  H: FnOnce(Err) -> Result<R, Err>,
  R: CoreObservable<O, Item = Item, Err = Err>,
  R::Unsub: Send + 'static,
  O: Observer<Item, Err>,
{
  type Unsub = SerialSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let serial = SerialSubscription::new();
    let first = SingleAssignmentSubscription::new();
    serial.set(first.clone());
    let observer = CatchObserver {
      observer: Some(observer),
      handler: Some(self.handler),
      serial: serial.clone(),
    };
    first.assign(self.source.actual_subscribe(observer));
    serial
  }
}

pub struct CatchObserver<O, H> {
  observer: Option<O>,
  handler: Option<H>,
  serial: SerialSubscription,
}

impl<O, H, R, Item, Err> Observer<Item, Err> for CatchObserver<O, H>
where
  H: FnOnce(Err) -> Result<R, Err>,
  R: CoreObservable<O, Item = Item, Err = Err>,
  R::Unsub: Send + 'static,
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.observer.next(value) }

  fn error(mut self, err: Err) {
    let (Some(observer), Some(handler)) = (self.observer.take(), self.handler.take()) else {
      return;
    };
    if self.serial.is_closed() {
      return;
    }
    match handler(err) {
      Ok(fallback) => {
        debug!("catch: switching to the fallback sequence");
        self.serial.set(fallback.actual_subscribe(observer));
      }
      Err(err) => observer.error(err),
    }
  }

  fn complete(self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() || self.serial.is_closed() }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[derive(Debug, Clone, PartialEq)]
  enum Failure {
    InvalidOperation(&'static str),
    Io,
  }

  #[test]
  fn switches_to_fallback() {
    let hit = Arc::new(Mutex::new(vec![]));
    let completed = Arc::new(Mutex::new(false));
    let (c_hit, c_completed) = (hit.clone(), completed.clone());
    observable::from_iter(1..=3)
      .fallible()
      .merge(observable::throw_err(Failure::InvalidOperation("Bang!")))
      .catch(|err| match err {
        Failure::InvalidOperation(_) => Ok(observable::from_iter(4..=6).fallible()),
        other => Err(other),
      })
      .subscribe_all(
        move |v| c_hit.lock().push(v),
        |_| unreachable!(),
        move || *c_completed.lock() = true,
      );
    assert_eq!(*hit.lock(), vec![1, 2, 3, 4, 5, 6]);
    assert!(*completed.lock());
  }

  #[test]
  fn unmatched_error_passes_through() {
    let err = Arc::new(Mutex::new(None));
    let c_err = err.clone();
    observable::throw_err::<i32, _>(Failure::Io)
      .catch(|err| match err {
        Failure::InvalidOperation(_) => Ok(observable::empty::<i32>().fallible()),
        other => Err(other),
      })
      .subscribe_all(|_| unreachable!(), move |e| *c_err.lock() = Some(e), || unreachable!());
    assert_eq!(*err.lock(), Some(Failure::Io));
  }

  #[test]
  fn fallback_errors_are_not_caught_again() {
    let err = Arc::new(Mutex::new(None));
    let c_err = err.clone();
    observable::throw_err::<i32, _>("first")
      .catch(|_| Ok(observable::throw_err("second")))
      .subscribe_all(|_| {}, move |e| *c_err.lock() = Some(e), || unreachable!());
    assert_eq!(*err.lock(), Some("second"));
  }

  #[test]
  fn dispose_reaches_the_fallback() {
    let source = Subject::<i32, &'static str>::default();
    let fallback = Subject::<i32, &'static str>::default();
    let c_fallback = fallback.clone();
    let sub = source
      .clone()
      .catch(move |_| Ok(c_fallback))
      .subscribe_all(|_| {}, |_| {}, || {});
    source.clone().error("boom");
    assert_eq!(fallback.observer_count(), 1);
    sub.unsubscribe();
    assert_eq!(fallback.observer_count(), 0);
  }
}
