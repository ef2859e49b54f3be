//! Deadlines for adapter calls.
//!
//! The signer and the node may block on network I/O indefinitely; every call
//! into them goes through [`bounded`].

use std::future::Future;
use std::time::Duration;

/// Run `fut` with a deadline, mapping expiry into the caller's error type.
pub async fn bounded<T, E, F>(
    duration: Duration,
    fut: F,
    on_elapsed: impl FnOnce(Duration) -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_elapsed(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let result: Result<u32, String> =
            bounded(Duration::from_secs(1), async { Ok(7) }, |_| "late".into()).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_bounded_maps_timeout() {
        let result: Result<u32, String> = bounded(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(7)
            },
            |d| format!("timed out after {}ms", d.as_millis()),
        )
        .await;
        assert_eq!(result.unwrap_err(), "timed out after 10ms");
    }
}
