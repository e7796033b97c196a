//! Bounded adaptive retry around an inference client.
//!
//! Each attempt runs under its own timeout. Retryable failures back off
//! exponentially from a base delay, except rate limits, which wait for the
//! provider's `retry_after` hint. Non-retryable failures return at once.

use async_trait::async_trait;
use opsweave_config::InferenceConfig;
use opsweave_core::error::InferenceError;
use opsweave_core::inference::{InferenceClient, InferenceRequest, InferenceResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Longest the wrapper will honour a rate-limit hint.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(30);

pub struct RetryingClient {
    name: String,
    inner: Arc<dyn InferenceClient>,
    max_attempts: u32,
    base_backoff: Duration,
    attempt_timeout: Duration,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn InferenceClient>) -> Self {
        Self {
            name: format!("retrying({})", inner.name()),
            inner,
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(20),
        }
    }

    /// Attempts, backoff and timeout from the `[inference]` section.
    pub fn from_config(inner: Arc<dyn InferenceClient>, config: &InferenceConfig) -> Self {
        Self::new(inner)
            .with_max_attempts(config.max_attempts)
            .with_base_backoff(Duration::from_millis(config.base_backoff_ms))
            .with_attempt_timeout(Duration::from_secs(config.request_timeout_secs))
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Delay before attempt `attempt + 1`, given the error from `attempt`.
    fn backoff_for(&self, attempt: u32, error: &InferenceError) -> Duration {
        match error {
            InferenceError::RateLimited { retry_after_secs } => {
                Duration::from_secs(*retry_after_secs).min(MAX_RATE_LIMIT_WAIT)
            }
            _ => self.base_backoff * 2u32.saturating_pow(attempt.saturating_sub(1)),
        }
    }
}

#[async_trait]
impl InferenceClient for RetryingClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        request: InferenceRequest,
    ) -> std::result::Result<InferenceResponse, InferenceError> {
        let mut attempt = 1;
        loop {
            let outcome =
                match tokio::time::timeout(self.attempt_timeout, self.inner.invoke(request.clone()))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(InferenceError::Timeout(format!(
                        "'{}' timed out after {}s",
                        self.inner.name(),
                        self.attempt_timeout.as_secs()
                    ))),
                };

            let error = match outcome {
                Ok(response) => {
                    if attempt > 1 {
                        info!(client = %self.inner.name(), attempt, "Inference succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= self.max_attempts {
                warn!(
                    client = %self.inner.name(),
                    attempt,
                    max_attempts = self.max_attempts,
                    error = %error,
                    "Inference failed, giving up"
                );
                return Err(error);
            }

            let delay = self.backoff_for(attempt, &error);
            warn!(
                client = %self.inner.name(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Inference failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
