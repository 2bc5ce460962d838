//! Serializable description of a backoff policy.

use super::backoff::BackoffFactory;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A backoff policy as it appears in configuration.
///
/// Durations are whole milliseconds. A `max_attempts` of 0 means unlimited.
///
/// # Examples
///
/// ```rust
/// use reqflow_core::retry::BackoffConfig;
///
/// let config: BackoffConfig = serde_json::from_str(
///     r#"{"strategy":"constant","interval_ms":250,"max_attempts":3}"#,
/// ).unwrap();
///
/// assert_eq!(
///     config,
///     BackoffConfig::Constant { interval_ms: 250, max_attempts: 3 },
/// );
/// let _factory = config.factory();
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BackoffConfig {
    /// Retry immediately.
    Zero {
        /// Retry cap
        #[serde(default)]
        max_attempts: u32,
    },

    /// Never retry.
    #[default]
    Stop,

    /// Fixed interval between attempts.
    Constant {
        /// Wait between attempts
        interval_ms: u64,
        /// Retry cap
        #[serde(default)]
        max_attempts: u32,
    },

    /// Exponential growth that stops at a ceiling.
    Exponential {
        /// Starting delay
        initial_ms: u64,
        /// Ceiling; reaching it stops the retries
        max_ms: u64,
        /// Growth factor
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        /// Retry cap
        #[serde(default)]
        max_attempts: u32,
    },

    /// Caller-supplied list of waits.
    Schedule {
        /// One wait per retry
        schedule_ms: Vec<u64>,
        /// Spread each wait over `[0.5x, 1.5x)`
        #[serde(default)]
        jitter: bool,
        /// Retry cap
        #[serde(default)]
        max_attempts: u32,
    },
}

fn default_multiplier() -> f64 {
    2.0
}

impl BackoffConfig {
    /// Build the factory this configuration describes.
    pub fn factory(&self) -> BackoffFactory {
        match self {
            BackoffConfig::Zero { max_attempts } => BackoffFactory::zero(*max_attempts),
            BackoffConfig::Stop => BackoffFactory::stop(),
            BackoffConfig::Constant {
                interval_ms,
                max_attempts,
            } => BackoffFactory::constant(Duration::from_millis(*interval_ms), *max_attempts),
            BackoffConfig::Exponential {
                initial_ms,
                max_ms,
                multiplier,
                max_attempts,
            } => {
                let (initial, max, multiplier, max_attempts) = (
                    Duration::from_millis(*initial_ms),
                    Duration::from_millis(*max_ms),
                    *multiplier,
                    *max_attempts,
                );
                BackoffFactory::from_fn(move || {
                    super::ExponentialBackoff::builder()
                        .initial_delay(initial)
                        .max_delay(max)
                        .multiplier(multiplier)
                        .max_attempts(max_attempts)
                        .build()
                })
            }
            BackoffConfig::Schedule {
                schedule_ms,
                jitter,
                max_attempts,
            } => BackoffFactory::schedule(
                schedule_ms.iter().copied().map(Duration::from_millis).collect(),
                *jitter,
                *max_attempts,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_stop() {
        assert_eq!(BackoffConfig::default(), BackoffConfig::Stop);
        assert_eq!(BackoffConfig::default().factory().build().next_delay(1), None);
    }

    #[test]
    fn test_parse_from_toml() {
        let config: BackoffConfig = toml::from_str(
            r#"
            strategy = "exponential"
            initial_ms = 100
            max_ms = 5000
            max_attempts = 4
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            BackoffConfig::Exponential {
                initial_ms: 100,
                max_ms: 5000,
                multiplier: 2.0,
                max_attempts: 4,
            }
        );
    }

    #[test]
    fn test_parse_schedule_defaults() {
        let config: BackoffConfig =
            serde_json::from_str(r#"{"strategy":"schedule","schedule_ms":[10,20]}"#).unwrap();

        let policy = config.factory().build();
        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(10)));
        assert_eq!(policy.next_delay(2), Some(Duration::from_millis(20)));
        assert_eq!(policy.next_delay(3), None);
    }

    #[test]
    fn test_zero_config_factory() {
        let config: BackoffConfig = serde_json::from_str(r#"{"strategy":"zero"}"#).unwrap();
        let policy = config.factory().build();
        assert_eq!(policy.next_delay(500), Some(Duration::ZERO));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let parsed = serde_json::from_str::<BackoffConfig>(r#"{"strategy":"fibonacci"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_roundtrip_through_json() {
        let config = BackoffConfig::Constant {
            interval_ms: 40,
            max_attempts: 2,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""strategy":"constant""#));
    }
}
