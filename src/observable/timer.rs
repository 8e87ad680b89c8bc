use std::{convert::Infallible, sync::Arc};

use parking_lot::Mutex;

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  scheduler::{Duration, Scheduler, TaskHandle},
  subscription::Subscription,
};

/// Emits `0` after `delay` on `scheduler`, then completes.
pub fn timer<Sch: Scheduler>(delay: Duration, scheduler: Sch) -> Timer<Sch> {
  Timer { delay, scheduler }
}

#[derive(Clone)]
pub struct Timer<Sch> {
  delay: Duration,
  scheduler: Sch,
}

impl<Sch> ObservableType for Timer<Sch> {
  type Item = usize;
  type Err = Infallible;
}

impl<Sch, O> CoreObservable<O> for Timer<Sch>
where
  Sch: Scheduler,
  O: Observer<usize, Infallible> + Send + 'static,
{
  type Unsub = TaskHandle;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    self.scheduler.schedule(
      Box::new(move || {
        if !observer.is_closed() {
          observer.next(0);
          observer.complete();
        }
      }),
      Some(self.delay),
    )
  }
}

/// Emits `0, 1, 2, ...` every `period` on `scheduler`. Never completes.
pub fn interval<Sch: Scheduler>(period: Duration, scheduler: Sch) -> Interval<Sch> {
  Interval { period, scheduler }
}

#[derive(Clone)]
pub struct Interval<Sch> {
  period: Duration,
  scheduler: Sch,
}

impl<Sch> ObservableType for Interval<Sch> {
  type Item = usize;
  type Err = Infallible;
}

impl<Sch, O> CoreObservable<O> for Interval<Sch>
where
  Sch: Scheduler,
  O: Observer<usize, Infallible> + Send + 'static,
{
  type Unsub = IntervalSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let subscription = IntervalSubscription::default();
    schedule_tick(self.scheduler, self.period, observer, 0, subscription.clone());
    subscription
  }
}

/// Holds the handle of the pending tick.
///
/// Ticks may be scheduled from the thread running the previous tick, so the
/// slot keeps whichever handle belongs to the highest tick index rather than
/// the one stored last.
#[derive(Clone, Default)]
pub struct IntervalSubscription(Arc<Mutex<IntervalSlot>>);

#[derive(Default)]
struct IntervalSlot {
  disposed: bool,
  pending: Option<(usize, TaskHandle)>,
}

impl IntervalSubscription {
  fn track(&self, tick: usize, handle: TaskHandle) {
    let mut slot = self.0.lock();
    if slot.disposed {
      drop(slot);
      handle.unsubscribe();
      return;
    }
    if slot.pending.as_ref().map_or(true, |(t, _)| *t < tick) {
      slot.pending = Some((tick, handle));
    }
  }
}

impl Subscription for IntervalSubscription {
  fn unsubscribe(self) {
    let mut slot = self.0.lock();
    slot.disposed = true;
    let pending = slot.pending.take();
    drop(slot);
    if let Some((_, handle)) = pending {
      handle.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.0.lock().disposed }
}

fn schedule_tick<Sch, O>(
  scheduler: Sch, period: Duration, mut observer: O, tick: usize, subscription: IntervalSubscription,
) where
  Sch: Scheduler,
  O: Observer<usize, Infallible> + Send + 'static,
{
  let c_scheduler = scheduler.clone();
  let c_subscription = subscription.clone();
  let handle = scheduler.schedule(
    Box::new(move || {
      if c_subscription.is_closed() || observer.is_closed() {
        return;
      }
      observer.next(tick);
      schedule_tick(c_scheduler, period, observer, tick + 1, c_subscription);
    }),
    Some(period),
  );
  subscription.track(tick, handle);
}
