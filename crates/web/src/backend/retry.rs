//! Bounded retry with linear backoff for backend calls.

use std::time::Duration;

/// How many times a backend call is attempted and how long to wait between
/// attempts.
///
/// The delay before retry `n` (1-based) is `base_backoff_ms * n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 150,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given failed attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(u64::from(attempt)))
    }

    /// Whether another attempt is allowed after `attempt` attempts have run.
    #[must_use]
    pub const fn allows_another(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_backoff_ms, 150);
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(150));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(300));
    }

    #[test]
    fn test_allows_another() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_another(1));
        assert!(policy.allows_another(2));
        assert!(!policy.allows_another(3));
    }
}
