//! # rxcore: the execution core of Reactive Extensions
//!
//! A thread-safe push-based operator substrate: observers, subscriptions,
//! sinks and the termination protocol every operator follows, plus a
//! representative operator set built on top of it.
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let numbers = std::sync::Arc::new(parking_lot::Mutex::new(vec![]));
//! let c_numbers = numbers.clone();
//! observable::from_iter(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(move |v| c_numbers.lock().push(v));
//! assert_eq!(*numbers.lock(), vec![0, 4, 8, 12, 16]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | Operator methods available on every observable |
//! | [`CoreObservable`] | `actual_subscribe(observer) -> Unsub`, the one narrow interface |
//! | [`Observer`] | Consumes `next`, `error` and `complete` events |
//! | [`Subscription`] | Handle to cancel an active subscription |
//! | [`Sink`] | Gate + downstream slot shared by multi-producer operators |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): `ThreadPoolScheduler` on the `futures`
//!   thread pool
//! - **`tokio-scheduler`**: `TokioScheduler` on a tokio runtime
//!
//! [`Observable`]: observable::Observable
//! [`CoreObservable`]: observable::CoreObservable
//! [`Observer`]: observer::Observer
//! [`Subscription`]: subscription::Subscription
//! [`Sink`]: sink::Sink

pub mod blocking;
pub mod error;
pub mod function;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod producer;
pub mod scheduler;
pub mod sink;
pub mod subject;
pub mod subscription;

pub use prelude::*;
