//! Backoff for messages handed back to the broker.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with optional jitter.
///
/// The delay before delivery attempt `n + 1` is `initial_delay * 2^(n - 1)`,
/// capped at `max_delay`. With jitter enabled the result is spread by up to
/// 25% either way so a burst of failures does not retry in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
    /// Whether to randomize delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before redelivering a message that has been attempted
    /// `attempts` times.
    #[must_use]
    pub fn delay_for(&self, attempts: i32) -> Duration {
        let exponent = u32::try_from(attempts.saturating_sub(1).max(0))
            .unwrap_or(0)
            .min(31);
        let base = self
            .initial_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay);

        if !self.jitter || base.is_zero() {
            return base;
        }
        let factor = rand::rng().random_range(0.75..=1.25);
        base.mul_f64(factor).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            jitter: false,
        }
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = policy();

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_is_capped() {
        assert_eq!(policy().delay_for(10), Duration::from_secs(1));
        assert_eq!(policy().delay_for(i32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_non_positive_attempts_use_initial_delay() {
        assert_eq!(policy().delay_for(0), Duration::from_millis(100));
        assert_eq!(policy().delay_for(-3), Duration::from_millis(100));
    }

    #[test]
    fn test_jitter_stays_within_quarter_of_base() {
        let policy = RetryPolicy {
            jitter: true,
            ..policy()
        };

        for _ in 0..100 {
            let delay = policy.delay_for(2);
            assert!(delay >= Duration::from_millis(150), "{delay:?}");
            assert!(delay <= Duration::from_millis(250), "{delay:?}");
        }
    }
}
