//! Source lookup retry logic
//!
//! Exponential backoff for transient metadata source failures (network
//! errors, rate limiting, 5xx responses). Permanent failures return at once.

use crate::source::{SourceError, SourceResult};
use cinegraph_common::config::RetryConfig;
use std::future::Future;
use std::time::{Duration, Instant};

/// Retry a source lookup with exponential backoff.
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. If the error is transient and attempts remain: log WARN, backoff, retry
/// 4. Otherwise return the error
///
/// Backoff starts at `initial_backoff_ms`, doubles per attempt and is capped
/// at `max_backoff_ms`.
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "movie 603", "company search page 2")
/// * `config` - Retry policy
/// * `operation` - Async closure performing the lookup
pub async fn retry_with_backoff<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> SourceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SourceResult<T>>,
{
    let start_time = Instant::now();
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    let mut backoff_ms = config.initial_backoff_ms;

    loop {
        attempt += 1;

        if attempt > 1 {
            tracing::debug!(operation = operation_name, attempt, "Retrying source lookup");
        }

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Source lookup succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_transient() {
                    return Err(err);
                }

                if attempt >= max_attempts {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        error = %err,
                        "Source lookup failed: retries exhausted"
                    );
                    return Err(err);
                }

                let next_backoff_ms = backoff_ms.min(config.max_backoff_ms);

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = next_backoff_ms,
                    error = %err,
                    "Transient source error, will retry after backoff"
                );

                tokio::time::sleep(Duration::from_millis(next_backoff_ms)).await;

                backoff_ms = backoff_ms.saturating_mul(2).min(config.max_backoff_ms);
            }
        }
    }
}

/// Map a `NotFound` result to `None`, keeping other errors
pub fn optional<T>(result: SourceResult<T>) -> SourceResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(SourceError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
