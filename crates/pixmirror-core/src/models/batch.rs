//! Batch rate-limit settings.

use std::time::Duration;

/// Rate-limit and retry settings for a batch of uploads.
///
/// Both the concurrency cap and the inter-task delay are needed to stay
/// under the secondary service's rate limit.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Hard ceiling on simultaneously running tasks.
    pub max_concurrent: usize,
    /// Fixed delay after every task completion before the next dispatch.
    pub inter_task_delay: Duration,
    /// Retry budget passed to both service clients.
    pub max_retries: u32,
    /// Base delay for the clients' backoff schedules.
    pub retry_base_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            inter_task_delay: Duration::from_millis(3000),
            max_retries: 5,
            retry_base_delay: Duration::from_millis(5000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_service_rate_limits() {
        let config = BatchConfig::default();
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.inter_task_delay, Duration::from_millis(3000));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_base_delay, Duration::from_millis(5000));
    }
}
