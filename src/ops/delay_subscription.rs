use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  scheduler::{Duration, Scheduler},
  subscription::CompositeSubscription,
};

/// Subscribes to the source only once `delay` has passed on the scheduler.
///
/// Disposing before then cancels the pending subscription; disposing later
/// disposes the source subscription.
#[derive(Clone)]
pub struct DelaySubscriptionOp<S, Sch> {
  source: S,
  delay: Duration,
  scheduler: Sch,
}

impl<S, Sch> DelaySubscriptionOp<S, Sch> {
  pub(crate) fn new(source: S, delay: Duration, scheduler: Sch) -> Self {
    DelaySubscriptionOp { source, delay, scheduler }
  }
}

impl<S: ObservableType, Sch> ObservableType for DelaySubscriptionOp<S, Sch> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, Sch, O> CoreObservable<O> for DelaySubscriptionOp<S, Sch>
where
  S: CoreObservable<O> + Send + 'static,
  S::Unsub: Send + 'static,
  Sch: Scheduler,
  O: Observer<S::Item, S::Err> + Send + 'static,
{
  type Unsub = CompositeSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let subscriptions = CompositeSubscription::new();
    let c_subscriptions = subscriptions.clone();
    let source = self.source;
    let task = self.scheduler.schedule(
      Box::new(move || {
        c_subscriptions.add(source.actual_subscribe(observer));
      }),
      Some(self.delay),
    );
    subscriptions.add(task);
    subscriptions
  }
}
