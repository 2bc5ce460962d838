//! The retry loop.

use super::backoff::BackoffFactory;
use super::context::{CallContext, CancelError};
use std::future::Future;

/// Failures that know whether they are worth another attempt.
///
/// The retry loop consults nothing else: any other classification a failure
/// carries is left for the caller to inspect once the call is over.
pub trait Retryable {
    /// Whether the operation that produced this failure may be attempted again.
    fn is_retryable(&self) -> bool;
}

impl Retryable for CancelError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Run `operation` until it succeeds, fails for good, runs out of backoff, or
/// the context is cancelled.
///
/// One [`Backoff`](super::Backoff) is built from `factory` for this call. Each
/// attempt receives a clone of `ctx` tagged with the 0-based attempt number.
///
/// - `Ok` is returned as soon as it is produced.
/// - A failure that is not [`Retryable::is_retryable`] is returned at once.
/// - Otherwise the retry counter is bumped and the backoff is asked for a wait.
///   `None` returns the last failure; `Some(wait)` races the wait against the
///   context and either loops or returns the cancellation reason.
///
/// # Examples
///
/// ```rust
/// use reqflow_core::retry::{retry, BackoffFactory, CallContext, CancelError, Retryable};
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// #[derive(Debug)]
/// struct Busy;
///
/// impl Retryable for Busy {
///     fn is_retryable(&self) -> bool {
///         true
///     }
/// }
///
/// impl From<CancelError> for Busy {
///     fn from(_: CancelError) -> Self {
///         Busy
///     }
/// }
///
/// # async fn example() {
/// let calls = AtomicU32::new(0);
/// let result = retry(&CallContext::new(), &BackoffFactory::zero(0), |ctx| {
///     calls.fetch_add(1, Ordering::SeqCst);
///     async move {
///         if ctx.attempt() < 2 { Err(Busy) } else { Ok(ctx.attempt()) }
///     }
/// })
/// .await;
///
/// assert_eq!(result.unwrap(), 2);
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # }
/// ```
pub async fn retry<T, E, F, Fut>(
    ctx: &CallContext,
    factory: &BackoffFactory,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(CallContext) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + From<CancelError>,
{
    let backoff = factory.build();
    let mut attempt: u32 = 0;

    loop {
        let err = match operation(ctx.for_attempt(attempt)).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() {
            return Err(err);
        }

        attempt = attempt.saturating_add(1);
        let Some(wait) = backoff.next_delay(attempt) else {
            #[cfg(feature = "tracing")]
            tracing::warn!(attempts = attempt, "backoff exhausted, giving up");
            return Err(err);
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            attempt,
            wait_ms = wait.as_millis() as u64,
            "retrying after backoff"
        );

        tokio::select! {
            biased;
            reason = ctx.done() => return Err(E::from(reason)),
            _ = tokio::time::sleep(wait) => {}
        }
    }
}
