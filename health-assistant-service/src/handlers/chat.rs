use axum::{extract::rejection::JsonRejection, extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

use super::resolve_model_result;
use crate::models::{ChatRequest, ChatResponse};
use crate::services::prompt::{build_chat_prompt, recent_history};
use crate::startup::AppState;

#[tracing::instrument(skip(state, payload))]
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload?;
    request.validate()?;

    let history = recent_history(request.history(), state.config.assistant.max_history_turns);
    if history.len() < request.history().len() {
        tracing::debug!(
            received = request.history().len(),
            kept = history.len(),
            "Truncated chat history"
        );
    }

    let prompt = build_chat_prompt(
        &state.config.assistant.system_instruction,
        history,
        &request.message,
    );

    tracing::info!(
        history_turns = history.len(),
        message_len = request.message.len(),
        "Processing chat message"
    );

    let result = state
        .model_client
        .generate_with_cancel("chat", &prompt, &state.shutdown)
        .await;
    let response = resolve_model_result(&state, "chat", result)?;

    Ok(Json(ChatResponse { response }))
}
