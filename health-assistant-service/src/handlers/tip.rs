use axum::{extract::State, Json};
use service_core::error::AppError;

use super::resolve_model_result;
use crate::config::TipSource;
use crate::models::TipResponse;
use crate::services::prompt::build_tip_prompt;
use crate::services::tips::{tip_for_date, today_utc};
use crate::startup::AppState;

/// Serve the tip of the day. Any request body is ignored.
#[tracing::instrument(skip(state))]
pub async fn tip(State(state): State<AppState>) -> Result<Json<TipResponse>, AppError> {
    let tip = match state.config.assistant.tip_source {
        TipSource::Daily => {
            let today = today_utc();
            tip_for_date(&state.config.assistant.tips, today)
                .map(str::to_string)
                .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Tip list is empty")))?
        }
        TipSource::Model => {
            let prompt = build_tip_prompt(&state.config.assistant.system_instruction);
            let result = state
                .model_client
                .generate_with_cancel("tip", &prompt, &state.shutdown)
                .await;
            resolve_model_result(&state, "tip", result)?
        }
    };

    Ok(Json(TipResponse { tip }))
}
