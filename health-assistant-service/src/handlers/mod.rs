//! HTTP handlers for the health assistant service.

pub mod chat;
pub mod health;
pub mod summarize;
pub mod tip;

pub use chat::chat;
pub use health::{health_check, index, metrics, not_found, readiness_check};
pub use summarize::summarize;
pub use tip::tip;

use crate::config::FailurePolicy;
use crate::services::ModelError;
use crate::startup::AppState;
use service_core::error::AppError;

pub const SERVICE_NAME: &str = "health-assistant-service";

/// Public endpoints, listed by `/` and by the 404 fallback.
pub const ENDPOINTS: [&str; 7] = [
    "GET /",
    "GET /api/health",
    "GET /api/ready",
    "POST /api/chat",
    "POST /api/summarize",
    "GET|POST /api/tip",
    "GET /metrics",
];

/// Apply the configured failure policy to the outcome of a model call.
fn resolve_model_result(
    state: &AppState,
    operation: &str,
    result: Result<String, ModelError>,
) -> Result<String, AppError> {
    match result {
        Ok(text) => Ok(text),
        Err(e) => match state.config.assistant.failure_policy {
            FailurePolicy::Propagate => Err(e.into()),
            FailurePolicy::Fallback => {
                tracing::warn!(operation, error = %e, "Model call failed, serving fallback message");
                Ok(state.config.assistant.fallback_message.clone())
            }
        },
    }
}
