use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

// ============================================================================
// Fixed-delay retry for remote calls
// ============================================================================
//
// Every remote call gets a short timeout. Idempotent-safe calls additionally
// get a bounded number of attempts with a fixed delay between them, but only
// for transient failures (network, 5xx). 4xx responses are final.
//
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Pause between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Timeout and retry settings shared by all remote calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallPolicy {
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl CallPolicy {
    /// Runs a non-idempotent call exactly once, under the timeout.
    pub async fn once<F, Fut, T>(&self, operation: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        match timeout(self.timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Network(format!(
                "timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    /// Runs an idempotent-safe call, retrying transient failures.
    pub async fn retrying<F, Fut, T>(&self, mut operation: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.once(&mut operation).await {
                Ok(result) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Call succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(error) if !error.is_transient() => {
                    tracing::debug!(error = %error, "Permanent failure, not retrying");
                    return Err(error);
                }
                Err(error) if attempt >= max_attempts => {
                    tracing::warn!(attempt, error = %error, "Call failed after all retries");
                    return Err(error);
                }
                Err(error) => {
                    tracing::debug!(
                        attempt,
                        error = %error,
                        delay_ms = self.retry.delay_ms,
                        "Transient failure, retrying after delay"
                    );
                    sleep(self.retry.delay()).await;
                }
            }
        }
    }
}
