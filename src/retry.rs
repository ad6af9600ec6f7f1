use crate::{CancellationState, HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Backoff unit in seconds; retry `k` waits `k` units
    pub backoff_unit_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_unit_secs: 10,
        }
    }
}

impl RetryConfig {
    /// Seconds to wait before retry number `retry` (1-based).
    ///
    /// The wait grows linearly: with the defaults, 10, 20, 30, 40 and 50
    /// seconds.
    pub fn backoff_secs(&self, retry: u32) -> u64 {
        self.backoff_unit_secs * u64::from(retry)
    }

    /// Total number of attempts, including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Result of a retry operation with context
#[derive(Debug)]
pub struct RetryResult<T> {
    /// The successful result
    pub result: T,
    /// Number of retries made before the successful attempt
    pub attempts_made: u32,
    /// Total time spent in backoff (in seconds)
    pub total_retry_time: u64,
}

/// Execute an async operation with bounded retries and linear backoff.
///
/// Every retryable failure (see [`HarvestError::is_retryable`]) is retried
/// after the linear backoff, or after the server's `retry_after` when a
/// [`HarvestError::RateLimit`] asks for longer, until `config.max_retries` retries have been spent; the failure of the last
/// attempt is then wrapped in [`HarvestError::FetchTerminal`]. Non-retryable
/// failures are returned as they are. Backoff sleeps end early with
/// [`HarvestError::Cancelled`] when `cancel` fires.
///
/// # Arguments
/// * `config` - Retry configuration
/// * `operation_name` - Name of the operation for logging
/// * `cancel` - Cancellation flag observed between attempts
/// * `operation` - Async function that returns a Result
/// * `on_retry` - Callback invoked before each backoff with the retry number,
///   the delay in seconds and the failure being retried
///
/// # Returns
/// A `RetryResult` containing the successful result and retry statistics
pub async fn retry_with_backoff<T, F, Fut, OnRetry>(
    config: &RetryConfig,
    operation_name: &str,
    cancel: &CancellationState,
    mut operation: F,
    mut on_retry: OnRetry,
) -> Result<RetryResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    OnRetry: FnMut(u32, u64, &HarvestError),
{
    let mut retries = 0;
    let mut total_retry_time = 0;

    loop {
        cancel.check()?;

        match operation().await {
            Ok(result) => {
                if retries > 0 {
                    log::info!("{operation_name} succeeded on retry {retries}");
                }
                return Ok(RetryResult {
                    result,
                    attempts_made: retries,
                    total_retry_time,
                });
            }
            Err(error) if !error.is_retryable() => return Err(error),
            Err(error) => {
                if retries >= config.max_retries {
                    log::warn!(
                        "Max retries ({}) exceeded for {operation_name}: {error}",
                        config.max_retries
                    );
                    return Err(HarvestError::FetchTerminal {
                        operation: operation_name.to_string(),
                        attempts: retries + 1,
                        source: Box::new(error),
                    });
                }

                retries += 1;
                let delay = match &error {
                    HarvestError::RateLimit { retry_after } => {
                        config.backoff_secs(retries).max(*retry_after)
                    }
                    _ => config.backoff_secs(retries),
                };

                log::info!(
                    "{operation_name} failed ({error}). Waiting {delay} seconds before retry {retries} of {}",
                    config.max_retries
                );
                on_retry(retries, delay, &error);

                cancel.sleep(Duration::from_secs(delay)).await?;
                total_retry_time += delay;
            }
        }
    }
}

/// Simplified retry function for operations that don't need retry callbacks
pub async fn retry_operation<T, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<RetryResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_backoff(
        config,
        operation_name,
        &CancellationState::new(),
        operation,
        |retry, delay, _| {
            log::debug!("Retry {retry} of {operation_name}: waiting {delay} seconds");
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_is_linear() {
        let config = RetryConfig::default();
        let delays: Vec<u64> = (1..=5).map(|retry| config.backoff_secs(retry)).collect();
        assert_eq!(delays, vec![10, 20, 30, 40, 50]);
        assert_eq!(config.max_attempts(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_operation() {
        let result = retry_operation(&RetryConfig::default(), "test", || async {
            Ok::<i32, HarvestError>(42)
        })
        .await;

        let retry_result = result.unwrap();
        assert_eq!(retry_result.result, 42);
        assert_eq!(retry_result.attempts_made, 0);
        assert_eq!(retry_result.total_retry_time, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_sixth_attempt() {
        let call_count = Arc::new(AtomicU32::new(0));
        let call_count_clone = call_count.clone();

        let result = retry_operation(&RetryConfig::default(), "test", move || {
            let count = call_count_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 5 {
                    Err(HarvestError::Http("connection reset".to_string()))
                } else {
                    Ok::<i32, HarvestError>(42)
                }
            }
        })
        .await;

        let retry_result = result.unwrap();
        assert_eq!(retry_result.result, 42);
        assert_eq!(retry_result.attempts_made, 5);
        assert_eq!(retry_result.total_retry_time, 150);
        assert_eq!(call_count.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_retries_exceeded() {
        let call_count = Arc::new(AtomicU32::new(0));
        let call_count_clone = call_count.clone();

        let result = retry_operation(&RetryConfig::default(), "lyrics", move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<i32, HarvestError>(HarvestError::LyricsNotFound {
                    url: "https://example.com".to_string(),
                })
            }
        })
        .await;

        match result.unwrap_err() {
            HarvestError::FetchTerminal {
                operation,
                attempts,
                source,
            } => {
                assert_eq!(operation, "lyrics");
                assert_eq!(attempts, 6);
                assert!(matches!(*source, HarvestError::LyricsNotFound { .. }));
            }
            other => panic!("Expected terminal error, got: {other:?}"),
        }
        assert_eq!(call_count.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_is_not_retried() {
        let call_count = Arc::new(AtomicU32::new(0));
        let call_count_clone = call_count.clone();

        let result = retry_operation(&RetryConfig::default(), "test", move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, HarvestError>(HarvestError::Cancelled) }
        })
        .await;

        assert!(matches!(result, Err(HarvestError::Cancelled)));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_retry_sees_schedule() {
        let config = RetryConfig {
            max_retries: 3,
            backoff_unit_secs: 2,
        };
        let mut seen = Vec::new();

        let result = retry_with_backoff(
            &config,
            "test",
            &CancellationState::new(),
            || async { Err::<(), HarvestError>(HarvestError::Http("503".to_string())) },
            |retry, delay, _| seen.push((retry, delay)),
        )
        .await;

        assert!(matches!(
            result,
            Err(HarvestError::FetchTerminal { attempts: 4, .. })
        ));
        assert_eq!(seen, vec![(1, 2), (2, 4), (3, 6)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_for_retry_after() {
        let config = RetryConfig {
            max_retries: 3,
            backoff_unit_secs: 10,
        };
        let mut failures = vec![
            HarvestError::RateLimit { retry_after: 5 },
            HarvestError::RateLimit { retry_after: 60 },
        ]
        .into_iter();
        let mut seen = Vec::new();

        let start = tokio::time::Instant::now();
        let result = retry_with_backoff(
            &config,
            "lyrics",
            &CancellationState::new(),
            || {
                let next = failures.next();
                async move {
                    match next {
                        Some(error) => Err(error),
                        None => Ok::<i32, HarvestError>(7),
                    }
                }
            },
            |retry, delay, _| seen.push((retry, delay)),
        )
        .await;

        let retry_result = result.unwrap();
        assert_eq!(retry_result.result, 7);
        // The first wait keeps the longer linear backoff; the second honours
        // the server's 60 seconds.
        assert_eq!(seen, vec![(1, 10), (2, 60)]);
        assert_eq!(retry_result.total_retry_time, 70);
        assert!(start.elapsed() >= Duration::from_secs(70));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_attempt() {
        let cancel = CancellationState::new();
        cancel.cancel();

        let result = retry_with_backoff(
            &RetryConfig::default(),
            "test",
            &cancel,
            || async { Ok::<i32, HarvestError>(1) },
            |_, _, _| {},
        )
        .await;

        assert!(matches!(result, Err(HarvestError::Cancelled)));
    }
}
