//! Resubscription after errors.
//!
//! ```
//! use std::sync::{
//!   atomic::{AtomicUsize, Ordering},
//!   Arc,
//! };
//!
//! use rxcore::prelude::*;
//!
//! let attempts = Arc::new(AtomicUsize::new(0));
//! let c_attempts = attempts.clone();
//! let source = observable::create(move |emitter: &mut dyn Emitter<i32, &'static str>| {
//!   if c_attempts.fetch_add(1, Ordering::SeqCst) < 2 {
//!     emitter.error("flaky");
//!   } else {
//!     emitter.next(1);
//!     emitter.complete();
//!   }
//! });
//!
//! source.retry(3).subscribe_all(|v| assert_eq!(v, 1), |_| unreachable!(), || {});
//! assert_eq!(attempts.load(Ordering::SeqCst), 3);
//! ```

use std::iter::Repeat;

use tracing::debug;

use crate::{
  observable::{CoreObservable, ObservableType},
  ops::fallback::{FallbackMode, FallbackOp},
  subscription::SerialSubscription,
};

/// Decides whether an error is retried.
///
/// ```
/// use rxcore::prelude::*;
///
/// #[derive(Clone)]
/// struct ServerErrors;
///
/// impl RetryPolicy<u16> for ServerErrors {
///   fn should_retry(&self, status: &u16, attempt: usize) -> bool {
///     attempt < 3 && (500..600).contains(status)
///   }
/// }
/// ```
pub trait RetryPolicy<Err> {
  /// `attempt` counts the retries already made, so it is 0 for the first
  /// error.
  fn should_retry(&self, err: &Err, attempt: usize) -> bool;

  /// Reset the attempt counter whenever the source emits a value.
  fn reset_on_success(&self) -> bool { false }
}

/// Retry up to this many times.
impl<Err> RetryPolicy<Err> for usize {
  fn should_retry(&self, _: &Err, attempt: usize) -> bool { attempt < *self }
}

/// Builder-style retry policy.
///
/// ```
/// use rxcore::prelude::*;
///
/// let config = RetryConfig::new().count(5).reset_on_success();
/// assert!(RetryPolicy::<()>::should_retry(&config, &(), 4));
/// assert!(!RetryPolicy::<()>::should_retry(&config, &(), 5));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RetryConfig {
  count: Option<usize>,
  reset_on_success: bool,
}

impl RetryConfig {
  /// Retry forever, never reset.
  pub fn new() -> Self { Self::default() }

  /// Sets the maximum number of retries. `count(3)` allows up to four
  /// subscriptions in total.
  pub fn count(mut self, count: usize) -> Self {
    self.count = Some(count);
    self
  }

  /// Reset the retry counter whenever the source emits a value, so a source
  /// that keeps making progress is retried indefinitely.
  pub fn reset_on_success(mut self) -> Self {
    self.reset_on_success = true;
    self
  }
}

impl<Err> RetryPolicy<Err> for RetryConfig {
  fn should_retry(&self, _: &Err, attempt: usize) -> bool {
    self.count.map_or(true, |count| attempt < count)
  }

  fn reset_on_success(&self) -> bool { self.reset_on_success }
}

pub struct RetryMode<P> {
  policy: P,
  attempt: usize,
}

impl<P, Err> FallbackMode<Err> for RetryMode<P>
where
  P: RetryPolicy<Err>,
{
  fn on_next(&mut self) {
    if self.policy.reset_on_success() {
      self.attempt = 0;
    }
  }

  fn on_error(&mut self, err: Err) -> Result<(), Err> {
    if !self.policy.should_retry(&err, self.attempt) {
      return Err(err);
    }
    self.attempt += 1;
    debug!(attempt = self.attempt, "retry: resubscribing");
    Ok(())
  }

  fn on_complete(&mut self) -> bool { false }

  fn on_exhausted(&mut self) -> Option<Err> { None }
}

#[derive(Clone)]
pub struct RetryOp<S, P> {
  source: S,
  policy: P,
}

impl<S, P> RetryOp<S, P> {
  pub(crate) fn new(source: S, policy: P) -> Self { RetryOp { source, policy } }
}

impl<S: ObservableType, P> ObservableType for RetryOp<S, P> {
  type Item = S::Item;
  type Err = S::Err;
}

type Attempts<S, P> = FallbackOp<Repeat<S>, RetryMode<P>>;

impl<S, P, O> CoreObservable<O> for RetryOp<S, P>
where
  S: ObservableType + Clone,
  Attempts<S, P>: CoreObservable<O, Unsub = SerialSubscription>,
{
  type Unsub = SerialSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let mode = RetryMode { policy: self.policy, attempt: 0 };
    FallbackOp::new(std::iter::repeat(self.source), mode).actual_subscribe(observer)
  }
}
