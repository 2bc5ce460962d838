//! Per-call context: attempt number, cancellation and deadline.

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a call stopped before it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelError {
    /// The caller's cancellation token fired.
    #[error("call cancelled")]
    Cancelled,

    /// The call's deadline passed.
    #[error("call deadline exceeded")]
    DeadlineExceeded,
}

/// Context handed to every attempt of a call.
///
/// The context is an explicit record rather than an opaque bag of values. It
/// carries:
///
/// - the 0-based attempt number, set by [`retry`](super::retry) before each
///   attempt so downstream logic can tell which retry it is running in
/// - a [`CancellationToken`] observed at every suspension point
/// - an optional deadline, which behaves like cancellation once it passes
///
/// Cloning is cheap and clones share the same cancellation token.
///
/// # Examples
///
/// ```rust
/// use reqflow_core::retry::CallContext;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() {
/// let token = CancellationToken::new();
/// let ctx = CallContext::new()
///     .with_cancellation(token.clone())
///     .with_timeout(Duration::from_secs(30));
///
/// assert_eq!(ctx.attempt(), 0);
/// token.cancel();
/// assert!(ctx.is_done());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    attempt: u32,
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe `token` for cancellation.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Stop the call at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop the call once `timeout` has elapsed from now.
    ///
    /// A timeout too large to express as an instant leaves the call without
    /// a deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// The same context, tagged with a different attempt number.
    pub(crate) fn for_attempt(&self, attempt: u32) -> Self {
        Self {
            attempt,
            ..self.clone()
        }
    }

    /// The 0-based number of the attempt currently in motion.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The cancellation token this context observes.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check: the reason this context is done, if it is.
    pub fn err(&self) -> Option<CancelError> {
        if self.token.is_cancelled() {
            return Some(CancelError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Whether the context has been cancelled or has passed its deadline.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolve once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a context with neither.
    pub async fn done(&self) -> CancelError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => CancelError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => CancelError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancelError::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context() {
        let ctx = CallContext::new();
        assert_eq!(ctx.attempt(), 0);
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_done());
        assert_eq!(ctx.err(), None);
    }

    #[test]
    fn test_for_attempt_shares_token() {
        let token = CancellationToken::new();
        let ctx = CallContext::new().with_cancellation(token.clone());
        let third = ctx.for_attempt(3);

        assert_eq!(third.attempt(), 3);
        assert_eq!(ctx.attempt(), 0);

        token.cancel();
        assert_eq!(third.err(), Some(CancelError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_on_cancel() {
        let token = CancellationToken::new();
        let ctx = CallContext::new().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        assert_eq!(ctx.done().await, CancelError::Cancelled);
        canceller.await.unwrap();
    }

    #[test]
    fn test_done_pending_until_cancelled() {
        let token = CancellationToken::new();
        let ctx = CallContext::new().with_cancellation(token.clone());
        let mut done = tokio_test::task::spawn(ctx.done());

        tokio_test::assert_pending!(done.poll());
        token.cancel();
        assert!(done.is_woken());
        tokio_test::assert_ready_eq!(done.poll(), CancelError::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_on_deadline() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_done());

        assert_eq!(ctx.done().await, CancelError::DeadlineExceeded);
        assert_eq!(ctx.err(), Some(CancelError::DeadlineExceeded));
    }

    #[test]
    fn test_unbounded_timeout_sets_no_deadline() {
        let ctx = CallContext::new().with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_wins_over_elapsed_deadline() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CallContext::new()
            .with_cancellation(token)
            .with_timeout(Duration::ZERO);

        assert_eq!(ctx.done().await, CancelError::Cancelled);
    }
}
