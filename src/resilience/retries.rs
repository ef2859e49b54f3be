//! Retry logic for whole reveal runs.
//!
//! # Responsibilities
//! - Decide whether a failed run may be repeated
//! - Wait with exponential backoff + jitter between attempts
//! - Stop early when the run is cancelled
//!
//! # Design Decisions
//! - Only errors whose `is_retryable()` holds are retried
//! - An ambiguous broadcast is never retried; the operation may be on chain
//! - Disabled retries mean exactly one attempt

use std::future::Future;

use crate::config::RetryConfig;
use crate::lifecycle::CancelToken;
use crate::reveal::RevealError;

/// Attempt budget and backoff bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// A single attempt.
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        if !config.enabled {
            return Self::none();
        }
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

/// Run `attempt` until it succeeds, fails permanently, or the budget is spent.
/// `attempt` receives the 1-based attempt number.
pub async fn run_with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut attempt: F,
) -> Result<T, RevealError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RevealError>>,
{
    let mut signal = cancel.signal();
    let mut number = 0;
    loop {
        number += 1;
        match attempt(number).await {
            Ok(value) => return Ok(value),
            Err(e) if number < policy.max_attempts && e.is_retryable() => {
                let delay = policy.backoff(number);
                tracing::warn!(
                    attempt = number,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "reveal attempt failed, retrying"
                );
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => return Err(e),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::ChainError;
    use crate::reveal::RevealStage;
    use crate::signer::SignerError;
    use crate::tezos::OperationHash;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    fn transport() -> RevealError {
        RevealError::Transport {
            stage: RevealStage::Init,
            source: SignerError::Unavailable("down".into()).into(),
        }
    }

    #[tokio::test]
    async fn test_retries_transport_until_success() {
        let calls = AtomicU32::new(0);
        let result = run_with_retries(&fast(3), &CancelToken::new(), |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(transport())
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retries(&fast(2), &CancelToken::new(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transport()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ambiguous_broadcast_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retries(&fast(5), &CancelToken::new(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(RevealError::AmbiguousBroadcast {
                    operation_hash: OperationHash([0u8; 32]),
                    source: ChainError::AmbiguousBroadcast("reset".into()),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(RevealError::AmbiguousBroadcast { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_retrying() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retries(&fast(5), &cancel, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transport()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disabled_config_means_one_attempt() {
        let config = RetryConfig::default();
        assert_eq!(RetryPolicy::from(&config), RetryPolicy::none());

        let enabled = RetryConfig {
            enabled: true,
            ..RetryConfig::default()
        };
        assert_eq!(RetryPolicy::from(&enabled).max_attempts, 3);
    }
}
