//! Provider used when the service runs without a model credential.

use super::{ProviderError, TextProvider};
use async_trait::async_trait;

/// Degraded-mode provider: every call fails permanently.
pub struct UnconfiguredTextProvider {
    reason: String,
}

impl UnconfiguredTextProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TextProvider for UnconfiguredTextProvider {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured(self.reason.clone()))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Err(ProviderError::NotConfigured(self.reason.clone()))
    }
}
