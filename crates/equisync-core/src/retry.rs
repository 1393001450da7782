//! Bounded fixed-delay retry for rate-limited upstream calls.

use std::time::Duration;

/// Delay applied after an HTTP 429 before retrying the identical call.
pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);

/// Retry policy: a fixed delay and a hard cap on retry attempts.
///
/// The cap keeps a sustained rate-limit condition from looping forever;
/// exhausting it surfaces the rate-limit error to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: RATE_LIMIT_DELAY,
        }
    }
}

impl RetryPolicy {
    pub const fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self { max_retries, delay }
    }

    pub const fn no_retry() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    /// Only the rate-limit status is retryable; every other failure is
    /// fatal for the call.
    pub const fn should_retry_status(self, status: u16) -> bool {
        status == 429
    }

    pub const fn attempts(self) -> u32 {
        self.max_retries + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_waits_sixty_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay, Duration::from_secs(60));
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.attempts(), 4);
    }

    #[test]
    fn only_rate_limit_status_is_retryable() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry_status(429));
        assert!(!policy.should_retry_status(500));
        assert!(!policy.should_retry_status(404));
        assert!(!policy.should_retry_status(200));
    }

    #[test]
    fn no_retry_disables_attempt_budget() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.delay, Duration::ZERO);
    }
}
