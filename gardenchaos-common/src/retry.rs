use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// First backoff before retrying a throttled call, per spec: "30s first
/// back-off then 3s".
pub const THROTTLE_FIRST_BACKOFF: Duration = Duration::from_secs(30);
/// Backoff applied to every retry after the first.
pub const THROTTLE_SUBSEQUENT_BACKOFF: Duration = Duration::from_secs(3);
/// Maximum number of attempts (the original call plus up to 4 retries).
pub const THROTTLE_MAX_ATTEMPTS: u32 = 5;

/// Runs `op`, retrying up to [`THROTTLE_MAX_ATTEMPTS`] times when
/// `is_throttling` says the error is a provider throttling error. Any other
/// error is returned immediately so the caller's own transient-error policy
/// (log and continue the control loop) applies.
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation_name: &str,
    op: F,
    is_throttling: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_with_backoff_config(
        operation_name,
        op,
        is_throttling,
        THROTTLE_MAX_ATTEMPTS,
        THROTTLE_FIRST_BACKOFF,
        THROTTLE_SUBSEQUENT_BACKOFF,
    )
    .await
}

/// Same as [`retry_with_backoff`] with explicit tuning, so tests don't have
/// to wait out the real 30s/3s provider backoff.
pub async fn retry_with_backoff_config<F, Fut, T, E>(
    operation_name: &str,
    mut op: F,
    is_throttling: impl Fn(&E) -> bool,
    max_attempts: u32,
    first_backoff: Duration,
    subsequent_backoff: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && is_throttling(&err) => {
                let backoff = if attempt == 1 { first_backoff } else { subsequent_backoff };
                warn!(
                    operation = operation_name,
                    attempt,
                    backoff_secs = backoff.as_secs(),
                    "provider throttled, backing off before retry"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const FAST: Duration = Duration::from_millis(1);

    #[tokio::test]
    async fn retries_until_success_within_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff_config(
            "test-op",
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("throttled")
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| true,
            THROTTLE_MAX_ATTEMPTS,
            FAST,
            FAST,
        )
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_throttling_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff_config(
            "test-op",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err("fatal") }
            },
            |_| false,
            THROTTLE_MAX_ATTEMPTS,
            FAST,
            FAST,
        )
        .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff_config(
            "test-op",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err("throttled") }
            },
            |_| true,
            THROTTLE_MAX_ATTEMPTS,
            FAST,
            FAST,
        )
        .await;
        assert_eq!(result, Err("throttled"));
        assert_eq!(calls.load(Ordering::SeqCst), THROTTLE_MAX_ATTEMPTS);
    }
}
