//! Retry utility for handling transient errors in async operations
//!
//! The wire client retries transport hiccups a bounded number of times
//! without any backoff; errors the caller classifies as permanent end the
//! loop immediately.

use std::time::Duration;
use tokio::time::sleep;

/// Configurable retry policy for async operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = `max_retries + 1`)
    pub max_retries: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Execute an async operation, retrying failures accepted by `is_retryable`
///
/// # Examples
/// ```rust
/// use memsqs::core::retry::{retry_async, RetryPolicy};
///
/// # async fn example() -> Result<String, String> {
/// let result = retry_async(
///     "queue_send",
///     RetryPolicy::default(),
///     |_err: &String| true,
///     || async { Ok::<String, String>("sent".to_string()) },
/// )
/// .await?;
/// # Ok(result)
/// # }
/// ```
pub async fn retry_async<F, T, E, Fut, R>(
    operation_name: &str,
    policy: RetryPolicy,
    is_retryable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if !is_retryable(&error) {
                    return Err(error);
                }
                if retries >= policy.max_retries {
                    log::warn!(
                        "Operation '{}' giving up after {} retries: {}",
                        operation_name,
                        retries,
                        error
                    );
                    return Err(error);
                }
                retries += 1;
                log::debug!(
                    "Operation '{}' failed, retry {}/{}: {}",
                    operation_name,
                    retries,
                    policy.max_retries,
                    error
                );
                if !policy.delay.is_zero() {
                    sleep(policy.delay).await;
                }
            }
        }
    }
}
