//! Retry strategies and the retry loop.
//!
//! # Key Types
//!
//! - [`Backoff`] - Core trait answering "wait how long, or stop?" for an attempt
//! - [`BackoffFactory`] - Produces a fresh [`Backoff`] for every call
//! - [`BackoffConfig`] - Serde description of a policy, for config files
//! - [`CallContext`] - Attempt number, cancellation and deadline for one call
//! - [`retry`] - The loop that ties them together
//!
//! # Examples
//!
//! ```rust
//! use reqflow_core::retry::{Backoff, ExponentialBackoff};
//! use std::time::Duration;
//!
//! let backoff = ExponentialBackoff::builder()
//!     .initial_delay(Duration::from_millis(100))
//!     .max_delay(Duration::from_secs(10))
//!     .max_attempts(5)
//!     .build();
//!
//! let first = backoff.next_delay(1).unwrap();
//! assert!(first >= Duration::from_millis(200));
//! ```

mod backoff;
mod config;
mod context;
mod exponential;
mod run;
mod schedule;

pub use backoff::{Backoff, BackoffFactory, ConstantBackoff, StopBackoff, ZeroBackoff};
pub use config::BackoffConfig;
pub use context::{CallContext, CancelError};
pub use exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
pub use run::{Retryable, retry};
pub use schedule::ScheduleBackoff;
pub use tokio_util::sync::CancellationToken;

/// Returns true once `attempt` has reached a configured cap. A cap of zero
/// means unlimited.
pub(crate) fn attempts_exhausted(attempt: u32, max_attempts: u32) -> bool {
    max_attempts > 0 && attempt >= max_attempts
}
