//! Exponential back-off with jitter for retriable gateway errors.

use crate::error::{GatewayError, GatewayResult};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay before the given attempt (1-based): base * 2^(attempt-1) plus up to
/// 25% jitter, capped at 30 seconds. A provider-supplied retry-after wins.
pub fn backoff_delay(attempt: u32, base: Duration, retry_after_secs: Option<u64>) -> Duration {
    if let Some(secs) = retry_after_secs {
        return Duration::from_secs(secs.min(60));
    }
    let exp = base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    let capped = exp.min(Duration::from_secs(30));
    let jitter = rand::thread_rng().gen_range(0.0..0.25);
    capped.mul_f64(1.0 + jitter)
}

/// Run `op` up to `max_attempts` times, sleeping between retriable failures.
pub async fn with_backoff<T, F, Fut>(
    label: &str,
    max_attempts: u32,
    base: Duration,
    mut op: F,
) -> GatewayResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GatewayResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retriable() && attempt < max_attempts => {
                let retry_after = match &e {
                    GatewayError::RateLimited { retry_after_secs } => *retry_after_secs,
                    _ => None,
                };
                let delay = backoff_delay(attempt, base, retry_after);
                warn!(label, attempt, error = %e, delay_ms = delay.as_millis() as u64, "retrying after back-off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_grows_and_caps() {
        let base = Duration::from_millis(100);
        let first = backoff_delay(1, base, None);
        assert!(first >= Duration::from_millis(100));
        assert!(first <= Duration::from_millis(125));
        let tenth = backoff_delay(10, base, None);
        assert!(tenth <= Duration::from_millis(37_500));
    }

    #[test]
    fn test_retry_after_wins() {
        let delay = backoff_delay(1, Duration::from_millis(100), Some(7));
        assert_eq!(delay, Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_with_backoff_retries_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let result = with_backoff("test", 3, Duration::from_millis(1), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(GatewayError::Timeout)
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_backoff_gives_up_on_non_retriable() {
        let attempts = AtomicU32::new(0);
        let result: GatewayResult<u32> = with_backoff("test", 3, Duration::from_millis(1), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(GatewayError::MalformedOutput("nope".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
