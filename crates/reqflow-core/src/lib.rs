#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core abstractions for the reqflow ecosystem.
//!
//! This crate holds the pieces of request execution that know nothing about
//! HTTP:
//!
//! - **Backoff policies** via the [`Backoff`](retry::Backoff) trait
//!   - zero-wait, never-retry, fixed-interval, exponential, fixed-schedule
//!   - a [`BackoffFactory`](retry::BackoffFactory) that hands out a fresh
//!     policy per call
//! - **Call context** via [`CallContext`](retry::CallContext): attempt number,
//!   cancellation token and deadline travelling down the call chain
//! - **The retry loop** via [`retry`](retry::retry)
//!
//! # Examples
//!
//! ```rust
//! use reqflow_core::prelude::*;
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct Flaky;
//!
//! impl Retryable for Flaky {
//!     fn is_retryable(&self) -> bool {
//!         true
//!     }
//! }
//!
//! impl From<CancelError> for Flaky {
//!     fn from(_: CancelError) -> Self {
//!         Flaky
//!     }
//! }
//!
//! # async fn example() {
//! let factory = BackoffFactory::constant(Duration::from_millis(1), 3);
//! let ctx = CallContext::new();
//!
//! let result: Result<(), Flaky> = retry(&ctx, &factory, |_ctx| async { Err(Flaky) }).await;
//! assert!(result.is_err());
//! # }
//! ```

pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use reqflow_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::retry::{
        Backoff, BackoffConfig, BackoffFactory, CallContext, CancelError, ConstantBackoff,
        ExponentialBackoff, ExponentialBackoffBuilder, Retryable, ScheduleBackoff, StopBackoff,
        ZeroBackoff, retry,
    };
}
