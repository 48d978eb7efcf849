use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use service_core::error::AppError;

use super::{ENDPOINTS, SERVICE_NAME};
use crate::services::metrics::get_metrics;
use crate::startup::AppState;

/// Liveness probe. Does not touch the model.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "Health assistant is running",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "model": {
            "provider": state.model_client.provider().name(),
            "id": state.config.model.text_model,
        }
    }))
}

/// Readiness probe. Fails while the model provider cannot be reached.
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state
        .model_client
        .provider()
        .health_check()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Readiness check failed");
            AppError::ServiceUnavailable(e.to_string())
        })?;

    Ok(Json(json!({
        "status": "ready",
        "service": SERVICE_NAME,
    })))
}

pub async fn index() -> impl IntoResponse {
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Health tips and health-only chat assistant backed by a Gemini model",
        "endpoints": ENDPOINTS,
    }))
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "available_endpoints": ENDPOINTS,
        })),
    )
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        get_metrics(),
    )
}
