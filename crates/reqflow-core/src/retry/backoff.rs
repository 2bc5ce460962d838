//! The backoff trait, the per-call factory, and the simple fixed policies.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::attempts_exhausted;
use super::exponential::ExponentialBackoff;
use super::schedule::ScheduleBackoff;

/// A policy deciding how long to wait before the next attempt, or whether to
/// stop retrying altogether.
///
/// A policy starts out active and becomes exhausted the first time
/// [`next_delay`](Backoff::next_delay) returns `None`. The retry loop never
/// consults an exhausted policy again.
///
/// # Examples
///
/// ```rust
/// use reqflow_core::retry::{Backoff, ConstantBackoff};
/// use std::time::Duration;
///
/// let backoff = ConstantBackoff::new(Duration::from_millis(50), 2);
/// assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(50)));
/// assert_eq!(backoff.next_delay(2), None);
/// ```
pub trait Backoff: Send + Sync {
    /// Calculate the wait before the next attempt.
    ///
    /// # Parameters
    /// - `attempt`: number of retries issued so far, starting at 1 for the
    ///   first failure
    ///
    /// # Returns
    /// - `Some(Duration)`: wait this long, then try again
    /// - `None`: give up and surface the last failure
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

impl<B: Backoff + ?Sized> Backoff for Box<B> {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (**self).next_delay(attempt)
    }
}

/// Retries immediately, forever or until `max_attempts` is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZeroBackoff {
    max_attempts: u32,
}

impl ZeroBackoff {
    /// Create a zero-wait policy. A `max_attempts` of 0 never stops.
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl Backoff for ZeroBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempts_exhausted(attempt, self.max_attempts) {
            return None;
        }
        Some(Duration::ZERO)
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopBackoff;

impl Backoff for StopBackoff {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        None
    }
}

/// Waits the same interval between every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBackoff {
    interval: Duration,
    max_attempts: u32,
}

impl ConstantBackoff {
    /// Create a fixed-interval policy. A `max_attempts` of 0 never stops.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

impl Backoff for ConstantBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempts_exhausted(attempt, self.max_attempts) {
            return None;
        }
        Some(self.interval)
    }
}

/// Produces a fresh [`Backoff`] for every top-level call.
///
/// Policies may carry per-call state, so a factory rather than a policy is
/// what gets stored in client and request configuration. Cloning a factory is
/// cheap.
///
/// # Examples
///
/// ```rust
/// use reqflow_core::retry::BackoffFactory;
/// use std::time::Duration;
///
/// let factory = BackoffFactory::schedule(
///     vec![Duration::from_millis(10), Duration::from_millis(100)],
///     false,
///     0,
/// );
///
/// let policy = factory.build();
/// assert_eq!(policy.next_delay(2), Some(Duration::from_millis(100)));
/// assert_eq!(policy.next_delay(3), None);
/// ```
#[derive(Clone)]
pub struct BackoffFactory {
    make: Arc<dyn Fn() -> Box<dyn Backoff> + Send + Sync>,
}

impl BackoffFactory {
    /// Wrap an arbitrary constructor.
    pub fn from_fn<F, B>(make: F) -> Self
    where
        F: Fn() -> B + Send + Sync + 'static,
        B: Backoff + 'static,
    {
        Self {
            make: Arc::new(move || Box::new(make()) as Box<dyn Backoff>),
        }
    }

    /// Factory for [`ZeroBackoff`].
    pub fn zero(max_attempts: u32) -> Self {
        Self::from_fn(move || ZeroBackoff::new(max_attempts))
    }

    /// Factory for [`StopBackoff`].
    pub fn stop() -> Self {
        Self::from_fn(|| StopBackoff)
    }

    /// Factory for [`ConstantBackoff`].
    pub fn constant(interval: Duration, max_attempts: u32) -> Self {
        Self::from_fn(move || ConstantBackoff::new(interval, max_attempts))
    }

    /// Factory for [`ExponentialBackoff`] with the default multiplier of 2.
    pub fn exponential(initial_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self::from_fn(move || {
            ExponentialBackoff::builder()
                .initial_delay(initial_delay)
                .max_delay(max_delay)
                .max_attempts(max_attempts)
                .build()
        })
    }

    /// Factory for [`ScheduleBackoff`].
    pub fn schedule(schedule: Vec<Duration>, jitter: bool, max_attempts: u32) -> Self {
        let schedule: Arc<[Duration]> = schedule.into();
        Self::from_fn(move || ScheduleBackoff::new(schedule.to_vec(), jitter, max_attempts))
    }

    /// Create a new policy instance.
    pub fn build(&self) -> Box<dyn Backoff> {
        (self.make)()
    }
}

impl Default for BackoffFactory {
    fn default() -> Self {
        Self::stop()
    }
}

impl fmt::Debug for BackoffFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffFactory").finish_non_exhaustive()
    }
}
