use std::sync::Arc;

use parking_lot::Mutex;

use super::{BoxedSubscription, Subscription};

/// Holds one replaceable resource.
///
/// Setting a new resource disposes the previous one; once the serial
/// subscription itself is disposed, every resource set afterwards is disposed
/// on arrival. Fallback operators use it to switch from a failed source to
/// its successor.
#[derive(Clone, Default)]
pub struct SerialSubscription(Arc<Mutex<SerialState>>);

#[derive(Default)]
struct SerialState {
  disposed: bool,
  current: Option<BoxedSubscription>,
}

impl SerialSubscription {
  pub fn new() -> Self { Self::default() }

  pub fn set(&self, subscription: impl Subscription + Send + 'static) {
    let mut state = self.0.lock();
    if state.disposed {
      drop(state);
      subscription.unsubscribe();
      return;
    }
    let prev = state
      .current
      .replace(BoxedSubscription::new(subscription));
    drop(state);
    if let Some(prev) = prev {
      prev.unsubscribe();
    }
  }
}

impl Subscription for SerialSubscription {
  fn unsubscribe(self) {
    let mut state = self.0.lock();
    if state.disposed {
      return;
    }
    state.disposed = true;
    let current = state.current.take();
    drop(state);
    if let Some(current) = current {
      current.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.0.lock().disposed }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::subscription::test::CountingSubscription;

  #[test]
  fn replacing_disposes_previous() {
    let serial = SerialSubscription::new();
    let first = CountingSubscription::default();
    let second = CountingSubscription::default();
    serial.set(first.clone());
    serial.set(second.clone());
    assert_eq!(first.disposed(), 1);
    assert_eq!(second.disposed(), 0);

    serial.clone().unsubscribe();
    assert_eq!(second.disposed(), 1);
    assert!(serial.is_closed());
  }

  #[test]
  fn set_after_dispose() {
    let serial = SerialSubscription::new();
    serial.clone().unsubscribe();
    serial.clone().unsubscribe();
    let late = CountingSubscription::default();
    serial.set(late.clone());
    assert_eq!(late.disposed(), 1);
  }

  #[test]
  fn concurrent_dispose_releases_once() {
    for _ in 0..100 {
      let serial = SerialSubscription::new();
      let current = CountingSubscription::default();
      serial.set(current.clone());
      let workers: Vec<_> = (0..4)
        .map(|_| {
          let serial = serial.clone();
          std::thread::spawn(move || serial.unsubscribe())
        })
        .collect();
      workers.into_iter().for_each(|w| w.join().unwrap());
      assert_eq!(current.disposed(), 1);
      assert!(serial.is_closed());
    }
  }
}
