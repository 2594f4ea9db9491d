//! Retry eligibility and exponential backoff

use std::time::Duration;

/// Default base delay for the first retry
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

/// Default cap applied to the exponential backoff
pub const DEFAULT_CAP_DELAY_MS: u64 = 30_000;

/// Retry policy: eligibility plus exponential backoff with a cap
///
/// Pure computation, no I/O. Attempts are 0-indexed: `max_retries = 2`
/// allows 3 total attempts. `backoff_delay(attempt)` takes the number of
/// retries already performed, so the first retry sleeps `base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound on any backoff delay
    pub cap_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            cap_delay: Duration::from_millis(DEFAULT_CAP_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with custom base and cap delays
    pub fn new(base_delay: Duration, cap_delay: Duration) -> Self {
        Self {
            base_delay,
            cap_delay,
        }
    }

    /// Whether another attempt is allowed after `attempt` has failed
    pub fn should_retry(&self, attempt: u32, max_retries: u32) -> bool {
        attempt < max_retries
    }

    /// Backoff delay before retry number `attempt` (0-indexed)
    ///
    /// `min(base_delay * 2^attempt, cap_delay)`, saturating on overflow.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = base_ms.saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.cap_delay.as_millis() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_retry_within_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0, 2));
        assert!(policy.should_retry(1, 2));
        assert!(!policy.should_retry(2, 2));
    }

    #[test]
    fn test_should_retry_zero_budget() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(0, 0));
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(1_000));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(2_000));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(16_000));
    }

    #[test]
    fn test_backoff_caps_at_thirty_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(10), Duration::from_millis(30_000));
        // Large attempt counts saturate rather than overflow
        assert_eq!(policy.backoff_delay(200), Duration::from_millis(30_000));
    }

    #[test]
    fn test_custom_policy() {
        let policy = RetryPolicy::new(Duration::from_millis(100), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(400));
    }
}
