//! Retry Executor
//!
//! Drives a fallible cloud call through the [`RetryPolicy`]: transient errors
//! are retried with backoff, permanent errors and cancellation stop at once.

use super::policy::{RetryPolicy, MAX_DELAY};
use crate::cancel::CancelSignal;
use crate::error::ApiError;
use std::future::Future;
use std::time::Duration;

/// Run `op` until it succeeds, fails permanently, runs out of retries or the
/// query is cancelled.
///
/// `op` is called at most `policy.max_attempts() + 1` times. When retries are
/// exhausted the last error is returned as-is.
pub async fn execute<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelSignal,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut retry_count: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_transient() {
            tracing::debug!("Not retrying permanent error: {}", err);
            return Err(err);
        }

        let decision = policy.decide(retry_count);
        if retry_count >= decision.max_attempts {
            tracing::warn!(
                "Giving up after {} retries: {}",
                retry_count,
                err
            );
            return Err(err);
        }

        let delay = backoff_delay(decision.delay, err.retry_after());
        tracing::warn!(
            "Transient error (retry {}/{}), backing off {:?}: {}",
            retry_count + 1,
            decision.max_attempts,
            delay,
            err
        );

        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
        }

        retry_count += 1;
    }
}

/// Honor a longer server hint, never exceeding the ceiling
fn backoff_delay(computed: Duration, retry_after: Option<Duration>) -> Duration {
    retry_after
        .map_or(computed, |hint| computed.max(hint))
        .min(MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel;
    use crate::retry::policy::ConnectionRetryConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn throttled() -> ApiError {
        ApiError::from_status(429, "", None)
    }

    #[test]
    fn test_backoff_prefers_longer_hint() {
        let computed = Duration::from_millis(25);
        assert_eq!(backoff_delay(computed, None), computed);
        assert_eq!(
            backoff_delay(computed, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(backoff_delay(computed, Some(Duration::from_millis(1))), computed);
        assert_eq!(backoff_delay(computed, Some(Duration::from_secs(3600))), MAX_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let result = execute(&policy, &CancelSignal::never(), || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(throttled())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let result: Result<(), _> = execute(&policy, &CancelSignal::never(), || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::from_status(403, "", None))
            }
        })
        .await;

        assert!(matches!(result, Err(ApiError::Client { status: 403, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::from_config(&ConnectionRetryConfig {
            max_error_retry_attempts: Some(10),
            min_error_retry_delay: None,
        });

        let result: Result<(), _> = execute(&policy, &CancelSignal::never(), || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Server {
                    status: 503,
                    message: format!("attempt {}", n),
                })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 11);
        match result {
            Err(ApiError::Server { message, .. }) => assert_eq!(message, "attempt 10"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_attempt() {
        let (canceller, signal) = cancel::pair();
        canceller.cancel();
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = execute(&RetryPolicy::default(), &signal, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(matches!(result, Err(ApiError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let (canceller, signal) = cancel::pair();
        let calls = Arc::new(AtomicU32::new(0));

        let task = tokio::spawn({
            let calls = calls.clone();
            async move {
                execute(&RetryPolicy::default(), &signal, || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(ApiError::from_status(
                            429,
                            "",
                            Some(Duration::from_secs(60)),
                        ))
                    }
                })
                .await
            }
        });

        // Let the first attempt run and enter its 60s backoff
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();

        let result = task.await.expect("task should not panic");
        assert!(matches!(result, Err(ApiError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
