//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Core traits and the source constructors
pub use crate::observable::{self, BoxOp, CoreObservable, Observable, ObservableType};
// Observers
pub use crate::observer::{BoxedObserver, Emitter, FnMutObserver, Observer, ObserverAll, SafeObserver};
// Operators with public configuration
pub use crate::ops::{
  group_by::GroupedObservable,
  retry::{RetryConfig, RetryPolicy},
};
// Schedulers
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::scheduler::{
  Duration, NewThreadScheduler, Scheduler, Stopwatch, Task, TaskHandle, TestScheduler,
};
// Subscriptions
pub use crate::subscription::{
  BoxedSubscription, ClosureSubscription, CompositeSubscription, EntryId, RefCountGuard,
  RefCountSubscription, SerialSubscription, SingleAssignmentSubscription, Subscription,
  SubscriptionExt, SubscriptionGuard,
};
pub use crate::{
  blocking::{BlockingIter, PullMode},
  error::RxError,
  function::{Fallible, Identity, Total},
  sink::{Sink, SinkHandle},
  subject::{Subject, SubjectSubscription},
};
