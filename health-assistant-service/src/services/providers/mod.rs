//! Text generation provider abstractions and implementations.
//!
//! Handlers never talk to a provider directly; they go through
//! [`crate::services::ModelClient`], which adds the retry policy.

pub mod gemini;
pub mod unconfigured;

use async_trait::async_trait;
use service_core::retry::Retryable;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Model overloaded: {0}")]
    Overloaded(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Empty response")]
    EmptyResponse,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Classification of a provider failure, decided once at the provider boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service is temporarily saturated; the same call may succeed later.
    TransientOverload,
    /// Retrying will not help.
    PermanentFailure,
    /// The upstream rejected the request itself.
    InvalidInput,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::TransientOverload => "transient_overload",
            FailureKind::PermanentFailure => "permanent_failure",
            FailureKind::InvalidInput => "invalid_input",
        }
    }
}

impl ProviderError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::Overloaded(_) => FailureKind::TransientOverload,
            ProviderError::InvalidRequest(_) => FailureKind::InvalidInput,
            ProviderError::NotConfigured(_)
            | ProviderError::RateLimited
            | ProviderError::ContentFiltered
            | ProviderError::EmptyResponse
            | ProviderError::ApiError(_)
            | ProviderError::NetworkError(_) => FailureKind::PermanentFailure,
        }
    }
}

impl Retryable for ProviderError {
    fn is_transient(&self) -> bool {
        self.kind() == FailureKind::TransientOverload
    }
}

/// Generation parameters for model requests.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    /// Temperature (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Maximum output tokens.
    pub max_tokens: Option<i32>,
}

/// Trait for text generation providers (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Short provider name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Generate a text completion for a single prompt.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
