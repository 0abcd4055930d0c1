//! Exponential backoff for the poll loop.

use std::time::Duration;

/// Poll interval growth after consecutive failures.
///
/// The interval after `n` consecutive failures is
/// `min(base * 2^(n - 1), max)`; with no failures it is `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(30))
    }
}

impl BackoffPolicy {
    /// Create a policy. `max` is raised to `base` if it is smaller.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    /// Interval used after a success.
    pub fn base(&self) -> Duration {
        self.base
    }

    /// Largest interval this policy produces.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Interval to wait after `failures` consecutive failures.
    pub fn interval_for(&self, failures: u32) -> Duration {
        let Some(exponent) = failures.checked_sub(1) else {
            return self.base;
        };
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |interval| interval.min(self.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_interval_progression() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.interval_for(0), secs(5));
        assert_eq!(policy.interval_for(1), secs(5));
        assert_eq!(policy.interval_for(2), secs(10));
        assert_eq!(policy.interval_for(3), secs(20));
        assert_eq!(policy.interval_for(4), secs(30));
        // Capped, not 80
        assert_eq!(policy.interval_for(5), secs(30));
    }

    #[test]
    fn test_huge_failure_count_saturates() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.interval_for(40), secs(30));
        assert_eq!(policy.interval_for(u32::MAX), secs(30));
    }

    #[test]
    fn test_max_below_base_is_raised() {
        let policy = BackoffPolicy::new(secs(10), secs(1));
        assert_eq!(policy.max(), secs(10));
        assert_eq!(policy.interval_for(3), secs(10));
    }
}
