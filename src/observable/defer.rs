use crate::observable::{CoreObservable, ObservableType};

/// Creates an observable that calls `factory` at each subscription and
/// subscribes to the observable it returns.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// observable::defer(|| {
///   println!("Hi!");
///   observable::of("Hello!")
/// })
/// .subscribe(move |v| println!("{}", v));
/// // Prints: Hi!\nHello!\n
/// ```
pub fn defer<F, S>(factory: F) -> Defer<F>
where
  F: FnOnce() -> S,
  S: ObservableType,
{
  Defer(factory)
}

#[derive(Clone)]
pub struct Defer<F>(F);

impl<F, S> ObservableType for Defer<F>
where
  F: FnOnce() -> S,
  S: ObservableType,
{
  type Item = S::Item;
  type Err = S::Err;
}

impl<F, S, O> CoreObservable<O> for Defer<F>
where
  F: FnOnce() -> S,
  S: CoreObservable<O>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub { (self.0)().actual_subscribe(observer) }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use crate::prelude::*;

  #[test]
  fn factory_runs_per_subscription() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let deferred = observable::defer(move || {
      c.fetch_add(1, Ordering::SeqCst);
      observable::of(1)
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    deferred.clone().subscribe(|_| {});
    deferred.subscribe(|_| {});
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
