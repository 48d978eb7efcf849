use axum::{extract::rejection::JsonRejection, extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

use super::resolve_model_result;
use crate::models::{SummarizeRequest, SummaryResponse};
use crate::services::prompt::build_summary_prompt;
use crate::startup::AppState;

/// Summarize the whole conversation sent by the client.
///
/// The conversation is not truncated here; clients needing a bounded prompt
/// trim it before sending.
#[tracing::instrument(skip(state, payload))]
pub async fn summarize(
    State(state): State<AppState>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>, AppError> {
    let Json(request) = payload?;
    request.validate()?;

    let prompt = build_summary_prompt(
        &state.config.assistant.system_instruction,
        &request.conversation,
    );

    tracing::info!(
        turns = request.conversation.len(),
        "Summarizing conversation"
    );

    let result = state
        .model_client
        .generate_with_cancel("summarize", &prompt, &state.shutdown)
        .await;
    let summary = resolve_model_result(&state, "summarize", result)?;

    Ok(Json(SummaryResponse { summary }))
}
