//! # Retry Loop
//!
//! Runs a fallible side effect under a `RetryPolicy`, sleeping with
//! exponential backoff between attempts. Every failure is logged; the last
//! error is returned once the attempts are exhausted.

use std::future::Future;

use crate::shared::config::RetryPolicy;
use crate::shared::error::ServiceError;

/// Outcome of a retried operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryReport {
    /// Attempts actually made
    pub attempts: u32,
    /// Final error, if the operation never succeeded
    pub last_error: Option<String>,
}

impl RetryReport {
    pub fn succeeded(&self) -> bool {
        self.last_error.is_none()
    }
}

/// Run `operation` until it succeeds or the policy gives up
pub async fn retry_with_backoff<F, Fut>(
    label: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> RetryReport
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ServiceError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(()) => {
                tracing::debug!(task = label, attempt, "side effect completed");
                return RetryReport {
                    attempts: attempt,
                    last_error: None,
                };
            }
            Err(ServiceError::Disabled { service }) => {
                tracing::debug!(task = label, service, "side effect skipped, service disabled");
                return RetryReport {
                    attempts: attempt,
                    last_error: None,
                };
            }
            Err(e) if attempt >= max_attempts => {
                tracing::error!(task = label, attempt, error = %e, "side effect failed, giving up");
                return RetryReport {
                    attempts: attempt,
                    last_error: Some(e.to_string()),
                };
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    task = label,
                    attempt,
                    error = %e,
                    "side effect failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
