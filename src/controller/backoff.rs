//! Exponential restart backoff with a ceiling.

use std::time::Duration;

/// Delay before the next restart attempt.
///
/// The delay for the k-th consecutive failure is `min(base * 2^k, ceiling)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    ceiling: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, ceiling: Duration) -> Self {
        Self { base, ceiling }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Delay after `consecutive_failures` failures in a row.
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        // 2^32 and above always exceeds any sane ceiling
        if consecutive_failures >= 32 {
            return self.ceiling;
        }
        let factor = 1u32 << consecutive_failures;
        self.base.saturating_mul(factor).min(self.ceiling)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sequence() {
        let policy = BackoffPolicy::default();
        let delays: Vec<u64> = (1..=7).map(|k| policy.delay_for(k).as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn test_monotonic_then_constant() {
        let policy = BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(60));
        let mut previous = Duration::ZERO;
        for k in 0..100 {
            let delay = policy.delay_for(k);
            assert!(delay >= previous);
            assert!(delay <= policy.ceiling());
            previous = delay;
        }
        assert_eq!(policy.delay_for(99), Duration::from_secs(60));
    }

    #[test]
    fn test_base_scales_delay() {
        let policy = BackoffPolicy::new(Duration::from_secs(3), Duration::from_secs(100));
        assert_eq!(policy.delay_for(1), Duration::from_secs(6));
        assert_eq!(policy.delay_for(2), Duration::from_secs(12));
        assert_eq!(policy.delay_for(6), Duration::from_secs(100));
    }

    #[test]
    fn test_huge_exponent_saturates() {
        let policy = BackoffPolicy::new(Duration::from_secs(u64::MAX / 2), Duration::from_secs(60));
        assert_eq!(policy.delay_for(31), Duration::from_secs(60));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_sub_second_base() {
        let policy = BackoffPolicy::new(Duration::from_millis(10), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_millis(20));
        assert_eq!(policy.delay_for(10), Duration::from_secs(1));
    }
}
