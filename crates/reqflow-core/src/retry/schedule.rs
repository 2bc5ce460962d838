//! Fixed schedule of waits, optionally jittered.

use super::attempts_exhausted;
use super::backoff::Backoff;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Walks a caller-supplied list of waits, one entry per retry.
///
/// Retry `n` waits for the `n`th entry of the schedule. Once the schedule runs
/// out, or `max_attempts` is reached, the policy stops. With jitter enabled
/// every wait is drawn from `[0.5x, 1.5x)` of the scheduled value.
///
/// The schedule lookup and the jitter generator sit behind a lock, so a single
/// instance tolerates being driven from more than one attempt at a time.
///
/// # Examples
///
/// ```rust
/// use reqflow_core::retry::{Backoff, ScheduleBackoff};
/// use std::time::Duration;
///
/// let backoff = ScheduleBackoff::new(
///     vec![Duration::from_millis(10), Duration::from_millis(50)],
///     false,
///     0,
/// );
///
/// assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(10)));
/// assert_eq!(backoff.next_delay(2), Some(Duration::from_millis(50)));
/// assert_eq!(backoff.next_delay(3), None);
/// ```
#[derive(Debug)]
pub struct ScheduleBackoff {
    state: Mutex<ScheduleState>,
    jitter: bool,
    max_attempts: u32,
}

#[derive(Debug)]
struct ScheduleState {
    ticks_ms: Vec<i64>,
    rng: StdRng,
}

impl ScheduleBackoff {
    /// Create a schedule policy. A `max_attempts` of 0 leaves the schedule
    /// length as the only bound.
    pub fn new(schedule: Vec<Duration>, jitter: bool, max_attempts: u32) -> Self {
        let ticks_ms = schedule
            .into_iter()
            .map(|tick| i64::try_from(tick.as_millis()).unwrap_or(i64::MAX))
            .collect();

        Self {
            state: Mutex::new(ScheduleState {
                ticks_ms,
                rng: StdRng::from_entropy(),
            }),
            jitter,
            max_attempts,
        }
    }
}

impl Backoff for ScheduleBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempts_exhausted(attempt, self.max_attempts) {
            return None;
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let index = usize::try_from(attempt).ok()?.checked_sub(1)?;
        let mut ms = *state.ticks_ms.get(index)?;
        if self.jitter {
            ms = jitter(ms, &mut state.rng);
        }

        Some(Duration::from_millis(u64::try_from(ms).unwrap_or(0)))
    }
}

/// Randomize `millis` into `[0.5 * millis, 1.5 * millis)`.
///
/// Non-positive input yields exactly 0; positive input never yields less than 1.
/// Results saturate at `i64::MAX`.
fn jitter<R: Rng>(millis: i64, rng: &mut R) -> i64 {
    if millis <= 0 {
        return 0;
    }
    (millis / 2).saturating_add(rng.gen_range(0..millis)).max(1)
}
