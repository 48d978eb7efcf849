//! Retrying client for the text generation model.
//!
//! A `ModelClient` is built once at startup and shared through the
//! application state. Each `generate` call owns its retry state; nothing is
//! shared between concurrent calls apart from the provider and the policy.

use crate::services::metrics;
use crate::services::providers::{FailureKind, ProviderError, TextProvider};
use service_core::error::AppError;
use service_core::retry::{RetryError, RetryPolicy, retry_with_policy};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Failure of a model call after the retry policy has been applied.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model overloaded, gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: ProviderError },

    #[error("model call failed: {0}")]
    Upstream(ProviderError),

    #[error("model call timed out after {0:?}")]
    TimedOut(Duration),

    #[error("model call cancelled")]
    Cancelled,
}

impl ModelError {
    /// Metric label for the outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            ModelError::RetriesExhausted { .. } => "exhausted",
            ModelError::Upstream(_) => "upstream",
            ModelError::TimedOut(_) => "timed_out",
            ModelError::Cancelled => "cancelled",
        }
    }

    /// Classification of the provider failure behind this error, if any.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ModelError::RetriesExhausted { last, .. } => Some(last.kind()),
            ModelError::Upstream(e) => Some(e.kind()),
            ModelError::TimedOut(_) | ModelError::Cancelled => None,
        }
    }
}

impl From<RetryError<ProviderError>> for ModelError {
    fn from(err: RetryError<ProviderError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => {
                ModelError::RetriesExhausted { attempts, last }
            }
            RetryError::Permanent(e) => ModelError::Upstream(e),
            RetryError::Cancelled { .. } => ModelError::Cancelled,
        }
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        AppError::UpstreamError(err.to_string())
    }
}

#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn TextProvider>,
    policy: RetryPolicy,
    request_timeout: Option<Duration>,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn TextProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            request_timeout: None,
        }
    }

    /// Bound the total time of one call, retries and backoff included.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn provider(&self) -> &Arc<dyn TextProvider> {
        &self.provider
    }

    /// Generate text for `prompt`, retrying while the model is overloaded.
    pub async fn generate(&self, operation: &str, prompt: &str) -> Result<String, ModelError> {
        self.generate_with_cancel(operation, prompt, &CancellationToken::new())
            .await
    }

    /// Like [`generate`](Self::generate), but a pending backoff ends as soon as
    /// `cancel` fires.
    pub async fn generate_with_cancel(
        &self,
        operation: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ModelError> {
        let started = Instant::now();
        let attempts = AtomicU32::new(0);

        let call = retry_with_policy(&self.policy, operation, cancel, || {
            attempts.fetch_add(1, Ordering::Relaxed);
            self.provider.generate(prompt)
        });

        let result = match self.request_timeout {
            // Dropping the retry future aborts both an in-flight call and a pending backoff
            Some(timeout) => match tokio::time::timeout(timeout, call).await {
                Ok(result) => result.map_err(ModelError::from),
                Err(_) => Err(ModelError::TimedOut(timeout)),
            },
            None => call.await.map_err(ModelError::from),
        };

        let attempts = attempts.load(Ordering::Relaxed);
        for _ in 1..attempts {
            metrics::record_model_retry(operation);
        }

        let elapsed = started.elapsed();
        match &result {
            Ok(_) => {
                metrics::record_model_call(operation, "success", elapsed.as_secs_f64());
                tracing::debug!(
                    operation,
                    provider = self.provider.name(),
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Model call succeeded"
                );
            }
            Err(e) => {
                metrics::record_model_call(operation, e.outcome(), elapsed.as_secs_f64());
                tracing::error!(
                    operation,
                    provider = self.provider.name(),
                    attempts,
                    outcome = e.outcome(),
                    kind = e.failure_kind().map(|k| k.as_str()).unwrap_or("none"),
                    error = %e,
                    "Model call failed"
                );
            }
        }

        result
    }
}
