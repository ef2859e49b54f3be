//! Exponential backoff with jitter between reveal attempts.

use rand::Rng;
use std::time::Duration;

use crate::resilience::retries::RetryPolicy;

/// Jitter is at most `delay / JITTER_DIVISOR`.
const JITTER_DIVISOR: u64 = 10;

impl RetryPolicy {
    /// Delay after the `failed`-th attempt (1-based), with jitter from the
    /// thread-local generator.
    pub fn backoff(&self, failed: u32) -> Duration {
        self.backoff_with(failed, &mut rand::thread_rng())
    }

    /// Delay after the `failed`-th attempt: `base · 2^(failed-1)` capped at
    /// `max_delay_ms`, plus up to a tenth of that drawn from `rng`.
    /// Nothing has failed yet at 0, so there is no wait.
    pub fn backoff_with<R: Rng>(&self, failed: u32, rng: &mut R) -> Duration {
        let Some(doublings) = failed.checked_sub(1) else {
            return Duration::ZERO;
        };

        let factor = 1u64.checked_shl(doublings).unwrap_or(u64::MAX);
        let delay = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);

        let spread = delay / JITTER_DIVISOR;
        let jitter = if spread > 0 { rng.gen_range(0..spread) } else { 0 };
        Duration::from_millis(delay + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn policy(base_delay_ms: u64, max_delay_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay_ms,
            max_delay_ms,
        }
    }

    #[test]
    fn test_nothing_failed_no_delay() {
        assert_eq!(policy(500, 5000).backoff(0), Duration::ZERO);
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let mut rng = StdRng::seed_from_u64(7);
        let p = policy(100, 1000);

        let first = p.backoff_with(1, &mut rng).as_millis();
        assert!((100..110).contains(&first));

        let second = p.backoff_with(2, &mut rng).as_millis();
        assert!((200..220).contains(&second));

        let capped = p.backoff_with(10, &mut rng).as_millis();
        assert!((1000..1100).contains(&capped));
    }

    #[test]
    fn test_huge_attempt_numbers_saturate() {
        let mut rng = StdRng::seed_from_u64(1);
        let delay = policy(100, 3000).backoff_with(200, &mut rng).as_millis();
        assert!((3000..3300).contains(&delay));
    }

    #[test]
    fn test_disabled_policy_never_waits() {
        assert_eq!(RetryPolicy::none().backoff(3), Duration::ZERO);
    }
}
