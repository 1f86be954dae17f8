//! Retry policies with computed backoff delays.
//!
//! The primary store retries with linear backoff, the secondary service
//! with exponential backoff on rate limits. Both formulas are pure
//! functions of the attempt counter so the clients can drive them from a
//! plain loop.

use std::time::Duration;

/// Backoff growth mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base_delay * (attempt + 1)`
    Linear,
    /// `base_delay * 2^attempt`
    Exponential,
}

/// Retry budget and delay schedule for one client.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_retries,
            base_delay,
            backoff,
        }
    }

    /// Delay to wait before retry number `attempt`, where `attempt` counts
    /// the failures seen so far (first retry is attempt 0).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(attempt.saturating_add(1)),
            Backoff::Exponential => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt.min(31))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff_schedule() {
        let policy = RetryPolicy::new(5, Duration::from_millis(5000), Backoff::Linear);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(5000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(10000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(15000));
    }

    #[test]
    fn test_exponential_backoff_schedule() {
        let policy = RetryPolicy::new(5, Duration::from_millis(5000), Backoff::Exponential);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(5000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(10000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(20000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(40000));
    }

    #[test]
    fn test_exponential_backoff_saturates() {
        let policy = RetryPolicy::new(64, Duration::from_secs(1), Backoff::Exponential);
        // Large attempt counts must not panic on overflow.
        let delay = policy.delay_for_attempt(63);
        assert!(delay >= policy.delay_for_attempt(31));
    }
}
