use std::sync::Arc;

use parking_lot::Mutex;

use super::{BoxedSubscription, Subscription};

/// A slot that accepts its resource exactly once.
///
/// Operators create the slot *before* subscribing upstream, hand a clone to
/// the observer, and assign the upstream handle once `actual_subscribe`
/// returns. If the observer already terminated (and disposed the slot) while
/// the subscribe call was running, the late assignment disposes the handle
/// immediately.
///
/// # Panics
///
/// Assigning a second resource to a live slot is a programming error and
/// panics.
///
/// # Examples
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let slot = SingleAssignmentSubscription::new();
/// slot.clone().unsubscribe();
/// // The late resource is released on arrival.
/// let late = SingleAssignmentSubscription::new();
/// slot.assign(late.clone());
/// assert!(late.is_closed());
/// ```
#[derive(Clone, Default)]
pub struct SingleAssignmentSubscription(Arc<Mutex<Slot>>);

#[derive(Default)]
enum Slot {
  #[default]
  Empty,
  Assigned(BoxedSubscription),
  Disposed,
}

impl SingleAssignmentSubscription {
  pub fn new() -> Self { Self::default() }

  pub fn assign(&self, subscription: impl Subscription + Send + 'static) {
    let mut slot = self.0.lock();
    match &*slot {
      Slot::Empty => *slot = Slot::Assigned(BoxedSubscription::new(subscription)),
      Slot::Assigned(_) => panic!("SingleAssignmentSubscription assigned twice"),
      Slot::Disposed => {
        drop(slot);
        subscription.unsubscribe();
      }
    }
  }

  pub fn is_assigned(&self) -> bool { !matches!(*self.0.lock(), Slot::Empty) }
}

impl Subscription for SingleAssignmentSubscription {
  fn unsubscribe(self) {
    let prev = std::mem::replace(&mut *self.0.lock(), Slot::Disposed);
    if let Slot::Assigned(inner) = prev {
      inner.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { matches!(*self.0.lock(), Slot::Disposed) }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::subscription::test::CountingSubscription;

  #[test]
  fn dispose_releases_assigned() {
    let inner = CountingSubscription::default();
    let slot = SingleAssignmentSubscription::new();
    slot.assign(inner.clone());
    assert!(slot.is_assigned());
    assert!(!slot.is_closed());

    slot.clone().unsubscribe();
    slot.clone().unsubscribe();
    assert!(slot.is_closed());
    assert_eq!(inner.disposed(), 1);
  }

  #[test]
  fn assign_after_dispose_disposes_immediately() {
    let slot = SingleAssignmentSubscription::new();
    slot.clone().unsubscribe();
    let inner = CountingSubscription::default();
    slot.assign(inner.clone());
    assert_eq!(inner.disposed(), 1);
  }

  #[test]
  #[should_panic(expected = "assigned twice")]
  fn second_assignment_panics() {
    let slot = SingleAssignmentSubscription::new();
    slot.assign(());
    slot.assign(());
  }

  #[test]
  fn concurrent_dispose_is_idempotent() {
    let inner = CountingSubscription::default();
    let slot = SingleAssignmentSubscription::new();
    slot.assign(inner.clone());
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let slot = slot.clone();
        std::thread::spawn(move || slot.unsubscribe())
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }
    assert_eq!(inner.disposed(), 1);
  }
}
