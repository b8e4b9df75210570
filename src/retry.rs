// src/retry.rs
//! Bounded retry with exponential backoff around a single outbound call.
//!
//! Classification: HTTP 4xx is terminal and returned immediately; timeouts,
//! 5xx and connection errors are retried up to the configured attempt
//! budget, after which the last failure is wrapped in `FetchError::Exhausted`.

use std::future::Future;

use crate::config::RetryPolicy;

/// Failure taxonomy for one provider transport call.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP status in [400, 500): the request itself is wrong, retrying
    /// cannot help.
    #[error("client error: http {status}: {message}")]
    Client { status: u16, message: String },

    /// HTTP 5xx from the provider.
    #[error("server error: http {status}")]
    Server { status: u16 },

    /// Timeout, connection reset, DNS failure, body decode failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Terminal wrapper after the attempt budget is spent.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub fn from_status(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        if status.is_client_error() {
            Self::Client {
                status: status.as_u16(),
                message: message.into(),
            }
        } else {
            Self::Server {
                status: status.as_u16(),
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Client { .. } | Self::Exhausted { .. })
    }
}

/// Runs an operation up to `policy.max_attempts` times, sleeping
/// `base_delay * backoff_factor^(attempt-1)` between retryable failures.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max = self.policy.max_attempts.max(1);
        let mut attempt = 1u32;
        loop {
            match operation().await {
                Ok(v) => return Ok(v),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt >= max {
                        return Err(FetchError::Exhausted {
                            attempts: max,
                            last: Box::new(e),
                        });
                    }
                    let delay = self.policy.delay_after(attempt);
                    tracing::debug!(
                        attempt,
                        max_attempts = max,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
