//! Retry utilities with fixed backoff for calls to external services.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Attempt cap and fixed delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay slept after each failed attempt except the last
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a fixed-backoff policy
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Execute an async operation, retrying every failure with a fixed delay.
///
/// Every error counts as transient. After `max_attempts` failures the last
/// error is returned to the caller. A `max_attempts` of zero behaves as one.
///
/// # Arguments
///
/// * `policy` - Attempt cap and delay
/// * `what` - Short description of the operation, used in log lines
/// * `operation` - The async operation to execute
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, what: &str, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;
    let mut operation = operation;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!(
                        "{} succeeded on attempt {} after {} failures",
                        what,
                        attempts,
                        attempts - 1
                    );
                }
                return Ok(result);
            }
            Err(error) if attempts >= max_attempts => {
                tracing::error!(
                    attempts = attempts,
                    error = %error,
                    "{} failed, giving up",
                    what
                );
                return Err(error);
            }
            Err(error) => {
                tracing::warn!(
                    attempt = attempts,
                    max_attempts = max_attempts,
                    error = %error,
                    "{} failed, retrying in {:?}",
                    what,
                    policy.delay
                );
                sleep(policy.delay).await;
            }
        }
    }
}
