use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::{BoxedSubscription, Subscription};

/// Identifies one entry of a [`CompositeSubscription`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

/// A dynamic set of resources disposed together.
///
/// Entries are tracked by id so a finished child (an inner observable of a
/// merge, say) can be removed and disposed on its own. Adding to a disposed
/// composite disposes the newcomer on arrival.
///
/// # Examples
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let group = CompositeSubscription::new();
/// let child = SingleAssignmentSubscription::new();
/// let id = group.add(child.clone()).unwrap();
/// assert_eq!(group.len(), 1);
///
/// // Removing disposes the child.
/// assert!(group.remove(id));
/// assert!(child.is_closed());
/// ```
#[derive(Clone, Default)]
pub struct CompositeSubscription(Arc<Mutex<CompositeState>>);

#[derive(Default)]
struct CompositeState {
  closed: bool,
  next_id: usize,
  items: SmallVec<[(usize, BoxedSubscription); 2]>,
}

impl CompositeSubscription {
  pub fn new() -> Self { Self::default() }

  /// Add a resource and return its id, or `None` if the composite is already
  /// disposed (the resource has then been disposed too).
  pub fn add(&self, subscription: impl Subscription + Send + 'static) -> Option<EntryId> {
    let mut state = self.0.lock();
    if state.closed {
      drop(state);
      subscription.unsubscribe();
      return None;
    }
    let id = state.next_id;
    state.next_id += 1;
    state
      .items
      .push((id, BoxedSubscription::new(subscription)));
    Some(EntryId(id))
  }

  /// Remove the entry and dispose it. Returns false if it was already gone.
  pub fn remove(&self, id: EntryId) -> bool {
    let mut state = self.0.lock();
    let removed = state
      .items
      .iter()
      .position(|(i, _)| *i == id.0)
      .map(|pos| state.items.remove(pos).1);
    drop(state);
    match removed {
      Some(item) => {
        item.unsubscribe();
        true
      }
      None => false,
    }
  }

  pub fn contains(&self, id: EntryId) -> bool {
    self
      .0
      .lock()
      .items
      .iter()
      .any(|(i, _)| *i == id.0)
  }

  /// Number of live entries.
  pub fn len(&self) -> usize { self.0.lock().items.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Subscription for CompositeSubscription {
  fn unsubscribe(self) {
    let mut state = self.0.lock();
    if state.closed {
      return;
    }
    state.closed = true;
    let items = std::mem::take(&mut state.items);
    drop(state);
    for (_, item) in items {
      item.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.0.lock().closed }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::subscription::test::CountingSubscription;

  #[test]
  fn add_remove() {
    let group = CompositeSubscription::new();
    let a = CountingSubscription::default();
    let b = CountingSubscription::default();
    let id_a = group.add(a.clone()).unwrap();
    let id_b = group.add(b.clone()).unwrap();
    assert_ne!(id_a, id_b);
    assert_eq!(group.len(), 2);

    assert!(group.remove(id_a));
    assert!(!group.remove(id_a));
    assert!(!group.contains(id_a));
    assert_eq!(a.disposed(), 1);
    assert_eq!(group.len(), 1);

    group.clone().unsubscribe();
    assert_eq!(b.disposed(), 1);
    assert!(group.is_empty());
  }

  #[test]
  fn add_after_dispose() {
    let group = CompositeSubscription::new();
    group.clone().unsubscribe();
    let late = CountingSubscription::default();
    assert!(group.add(late.clone()).is_none());
    assert_eq!(late.disposed(), 1);
  }

  #[test]
  fn concurrent_dispose_releases_each_child_once() {
    let group = CompositeSubscription::new();
    let children: Vec<_> = (0..4)
      .map(|_| {
        let c = CountingSubscription::default();
        group.add(c.clone());
        c
      })
      .collect();
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let group = group.clone();
        std::thread::spawn(move || group.unsubscribe())
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }
    assert!(children.iter().all(|c| c.disposed() == 1));
  }
}
