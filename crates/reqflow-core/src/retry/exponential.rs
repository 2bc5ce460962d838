//! Exponential backoff with jitter and a hard ceiling.

use super::attempts_exhausted;
use super::backoff::Backoff;
use std::time::Duration;

/// Exponential backoff strategy with built-in jitter.
///
/// Delays grow as `initial_delay * multiplier^attempt`, scaled by a random
/// factor in `[1, 2)`. Unlike a capped backoff, reaching `max_delay` is treated
/// as the signal to give up: once the computed wait would meet or exceed the
/// ceiling, the policy stops instead of waiting.
///
/// # Mathematical Formula
///
/// For retry `n` (1-based), in whole milliseconds:
/// ```text
/// r     = random(1.0, 2.0)
/// wait  = min(r * initial_ms * multiplier^n, max_ms)
/// stop if wait >= max_ms, or if n has reached max_attempts
/// ```
///
/// # Examples
///
/// ```rust
/// use reqflow_core::retry::{Backoff, ExponentialBackoff};
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .initial_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_secs(30))
///     .max_attempts(5)
///     .build();
///
/// // 100ms * 2^1 * [1, 2) lands in [200ms, 400ms)
/// let delay = backoff.next_delay(1).unwrap();
/// assert!(delay >= Duration::from_millis(200) && delay < Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    initial_ms: f64,
    max_ms: f64,
    multiplier: f64,
    max_attempts: u32,
}

impl ExponentialBackoff {
    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// Compute the wait for `attempt` given a random scale in `[1, 2)`.
    fn delay_with_scale(&self, attempt: u32, scale: f64) -> Option<Duration> {
        if attempts_exhausted(attempt, self.max_attempts) {
            return None;
        }

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let wait_ms = (scale * self.initial_ms * self.multiplier.powi(exponent)).min(self.max_ms);
        if wait_ms >= self.max_ms {
            return None;
        }

        // Truncate to whole milliseconds.
        Some(Duration::from_millis(wait_ms as u64))
    }
}

impl Default for ExponentialBackoff {
    /// Defaults:
    /// - `initial_delay`: 100ms
    /// - `max_delay`: 60s
    /// - `multiplier`: 2.0
    /// - `max_attempts`: 0 (bounded only by `max_delay`)
    fn default() -> Self {
        ExponentialBackoffBuilder::default().build()
    }
}

impl Backoff for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        let scale = 1.0 + rand::random::<f64>();
        self.delay_with_scale(attempt, scale)
    }
}

/// Builder for configuring [`ExponentialBackoff`].
///
/// # Examples
///
/// ```rust
/// use reqflow_core::retry::ExponentialBackoff;
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .initial_delay(Duration::from_millis(250))
///     .max_delay(Duration::from_secs(5))
///     .multiplier(3.0)
///     .max_attempts(4)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    max_attempts: Option<u32>,
}

impl ExponentialBackoffBuilder {
    /// Set the base delay the exponential growth starts from.
    ///
    /// Default: 100ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the ceiling. A computed wait at or above it stops the retries.
    ///
    /// Default: 60s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the exponential factor.
    ///
    /// Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Cap the number of retries. Zero leaves the ceiling as the only bound.
    ///
    /// Default: 0
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Build the `ExponentialBackoff` instance.
    ///
    /// Uses default values for any unset parameters.
    pub fn build(self) -> ExponentialBackoff {
        let initial = self.initial_delay.unwrap_or(Duration::from_millis(100));
        let max = self.max_delay.unwrap_or(Duration::from_secs(60));
        ExponentialBackoff {
            initial_ms: initial.as_millis() as f64,
            max_ms: max.as_millis() as f64,
            multiplier: self.multiplier.unwrap_or(2.0),
            max_attempts: self.max_attempts.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff(initial_ms: u64, max_ms: u64, max_attempts: u32) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .initial_delay(Duration::from_millis(initial_ms))
            .max_delay(Duration::from_millis(max_ms))
            .max_attempts(max_attempts)
            .build()
    }

    #[test]
    fn test_exponential_delay_calculation() {
        let backoff = backoff(100, 100_000, 0);

        // Lower edge of the random scale
        assert_eq!(backoff.delay_with_scale(1, 1.0), Some(Duration::from_millis(200)));
        assert_eq!(backoff.delay_with_scale(2, 1.0), Some(Duration::from_millis(400)));
        assert_eq!(backoff.delay_with_scale(3, 1.0), Some(Duration::from_millis(800)));

        // Scale 1.5 lands halfway through the range
        assert_eq!(backoff.delay_with_scale(1, 1.5), Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_truncates_to_whole_milliseconds() {
        let backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_secs(10))
            .multiplier(1.5)
            .build();

        // 1 * 1.5^1 = 1.5ms -> 1ms
        assert_eq!(backoff.delay_with_scale(1, 1.0), Some(Duration::from_millis(1)));
    }

    #[test]
    fn test_ceiling_stops_instead_of_waiting() {
        let backoff = backoff(100, 1_000, 0);

        // 100 * 2^3 = 800ms, still under the ceiling
        assert!(backoff.delay_with_scale(3, 1.0).is_some());
        // 100 * 2^4 = 1600ms, clamped to the ceiling, which means stop
        assert_eq!(backoff.delay_with_scale(4, 1.0), None);
    }

    #[test]
    fn test_wait_equal_to_ceiling_stops() {
        let backoff = backoff(250, 1_000, 0);
        // 250 * 2^2 = 1000ms == ceiling
        assert_eq!(backoff.delay_with_scale(2, 1.0), None);
    }

    #[test]
    fn test_max_attempts() {
        let backoff = backoff(1, 60_000, 3);
        assert!(backoff.next_delay(1).is_some());
        assert!(backoff.next_delay(2).is_some());
        assert_eq!(backoff.next_delay(3), None);
    }

    #[test]
    fn test_jitter_range() {
        let backoff = backoff(100, 60_000, 0);
        for _ in 0..100 {
            let delay = backoff.next_delay(1).unwrap();
            assert!(
                (200..400).contains(&delay.as_millis()),
                "Delay should be in [200ms, 400ms), got {:?}",
                delay
            );
        }
    }

    #[test]
    fn test_builder_defaults() {
        let backoff = ExponentialBackoff::builder().build();

        assert_eq!(backoff.initial_ms, 100.0);
        assert_eq!(backoff.max_ms, 60_000.0);
        assert_eq!(backoff.multiplier, 2.0);
        assert_eq!(backoff.max_attempts, 0);
        assert_eq!(backoff, ExponentialBackoff::default());
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let backoff = backoff(100, 60_000, 0);
        assert_eq!(backoff.next_delay(u32::MAX), None);
    }
}
