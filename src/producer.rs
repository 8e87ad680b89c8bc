//! Subscribe-time scaffolding for operators built on a [`Sink`](crate::sink::Sink).
//!
//! An operator's `actual_subscribe` creates its sink, builds the upstream
//! observer around a clone of it, and calls [`run`]. The upstream handle is
//! installed into the sink's composite only after `actual_subscribe` returns,
//! so a source that terminates synchronously (and therefore disposed the
//! sink already) has its handle disposed on arrival instead of leaking.

use crate::{
  observable::CoreObservable,
  sink::SinkHandle,
  subscription::{CompositeSubscription, EntryId, SingleAssignmentSubscription},
};

/// Subscribe `source` with `observer`, install the upstream subscription into
/// `handle`, and return the handle as the operator's subscription.
pub fn run<S, O>(source: S, observer: O, handle: SinkHandle) -> SinkHandle
where
  S: CoreObservable<O>,
  S::Unsub: Send + 'static,
{
  let upstream = source.actual_subscribe(observer);
  handle.install(upstream);
  handle
}

/// Reserve a slot in `handle` for an additional source, then subscribe it.
///
/// `make` receives the slot's composite entry so the observer can remove
/// itself when its source finishes. Returns `false` if the sink was already
/// disposed; `source` is then never subscribed.
pub fn attach<S, O>(
  source: S, handle: &SinkHandle, make: impl FnOnce(EntryId) -> O,
) -> bool
where
  S: CoreObservable<O>,
  S::Unsub: Send + 'static,
{
  attach_to(source, handle.upstream(), make)
}

/// [`attach`] into any composite, for resources that must outlive the sink.
pub fn attach_to<S, O>(
  source: S, composite: &CompositeSubscription, make: impl FnOnce(EntryId) -> O,
) -> bool
where
  S: CoreObservable<O>,
  S::Unsub: Send + 'static,
{
  let slot = SingleAssignmentSubscription::new();
  let Some(id) = composite.add(slot.clone()) else {
    return false;
  };
  let upstream = source.actual_subscribe(make(id));
  slot.assign(upstream);
  true
}
