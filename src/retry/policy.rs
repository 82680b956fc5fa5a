//! Retry Policy
//!
//! Exponential backoff (base 3) with ±20% jitter, tuned per connection.

use rand::Rng;
use std::time::Duration;

/// Default and floor for the number of retries
pub const DEFAULT_MAX_ATTEMPTS: u32 = 9;

/// Default and floor for the base delay
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(25);

/// Hard ceiling for any single backoff
pub const MAX_DELAY: Duration = Duration::from_secs(5 * 60);

/// Growth factor per retry
const BACKOFF_BASE: f64 = 3.0;

/// Jitter bounds applied to the nominal delay
pub const JITTER_MIN: f64 = 0.80;
pub const JITTER_MAX: f64 = 1.20;

/// Beyond this many retries the nominal delay is far past the ceiling anyway
const MAX_EXPONENT: u32 = 64;

/// Per-connection retry settings as configured by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionRetryConfig {
    pub max_error_retry_attempts: Option<u32>,
    pub min_error_retry_delay: Option<Duration>,
}

/// Outcome of evaluating one retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub max_attempts: u32,
    pub delay: Duration,
}

/// Resolved retry policy for a connection
///
/// Configured values only take effect when they exceed the defaults;
/// anything lower silently falls back to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_MIN_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Build the policy from a connection config
    pub fn from_config(config: &ConnectionRetryConfig) -> Self {
        let max_attempts = config
            .max_error_retry_attempts
            .filter(|&n| n > DEFAULT_MAX_ATTEMPTS)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let base_delay = config
            .min_error_retry_delay
            .filter(|&d| d > DEFAULT_MIN_DELAY)
            .unwrap_or(DEFAULT_MIN_DELAY);

        Self {
            max_attempts,
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Un-jittered, uncapped delay for a retry, in nanoseconds
    pub fn nominal_delay_nanos(&self, retry_count: u32) -> f64 {
        let exponent = retry_count.min(MAX_EXPONENT) as i32;
        self.base_delay.as_nanos() as f64 * BACKOFF_BASE.powi(exponent)
    }

    /// Delay for a retry with an explicit jitter factor, capped at [`MAX_DELAY`]
    pub fn delay_with_jitter(&self, retry_count: u32, jitter: f64) -> Duration {
        let jittered = (self.nominal_delay_nanos(retry_count) * jitter.max(0.0)).round();
        if jittered.is_nan() || jittered >= MAX_DELAY.as_nanos() as f64 {
            return MAX_DELAY;
        }
        Duration::from_nanos(jittered as u64)
    }

    /// Compute the backoff for the given retry count with a fresh jitter draw
    pub fn decide(&self, retry_count: u32) -> RetryDecision {
        let jitter = rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX);
        RetryDecision {
            max_attempts: self.max_attempts,
            delay: self.delay_with_jitter(retry_count, jitter),
        }
    }
}

/// Compute the retry decision for a connection config and retry count
pub fn decide(config: &ConnectionRetryConfig, retry_count: u32) -> RetryDecision {
    RetryPolicy::from_config(config).decide(retry_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let policy = RetryPolicy::from_config(&ConnectionRetryConfig::default());
        assert_eq!(policy.max_attempts(), 9);
        assert_eq!(policy.base_delay(), Duration::from_millis(25));
    }

    #[test]
    fn test_lower_values_are_ignored() {
        let config = ConnectionRetryConfig {
            max_error_retry_attempts: Some(3),
            min_error_retry_delay: Some(Duration::from_millis(5)),
        };
        assert_eq!(RetryPolicy::from_config(&config), RetryPolicy::default());

        let config = ConnectionRetryConfig {
            max_error_retry_attempts: Some(9),
            min_error_retry_delay: Some(Duration::from_millis(25)),
        };
        assert_eq!(RetryPolicy::from_config(&config), RetryPolicy::default());
    }

    #[test]
    fn test_higher_values_override() {
        let config = ConnectionRetryConfig {
            max_error_retry_attempts: Some(12),
            min_error_retry_delay: Some(Duration::from_millis(100)),
        };
        let decision = decide(&config, 0);
        assert_eq!(decision.max_attempts, 12);
        assert!(decision.delay >= Duration::from_millis(80));
        assert!(decision.delay <= Duration::from_millis(120));
    }

    #[test]
    fn test_growth_is_base_three() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_with_jitter(0, 1.0), Duration::from_millis(25));
        assert_eq!(policy.delay_with_jitter(1, 1.0), Duration::from_millis(75));
        assert_eq!(policy.delay_with_jitter(2, 1.0), Duration::from_millis(225));
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_with_jitter(1, JITTER_MIN), Duration::from_millis(60));
        assert_eq!(policy.delay_with_jitter(1, JITTER_MAX), Duration::from_millis(90));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();
        // 25ms * 3^9 = 492s
        assert_eq!(policy.delay_with_jitter(9, 1.0), MAX_DELAY);
        assert_eq!(policy.decide(u32::MAX).delay, MAX_DELAY);
    }
}
