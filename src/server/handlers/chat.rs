use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub model: Option<String>,
}

/// Runs one full turn. Holding the session lock for the whole turn keeps
/// turns within a session strictly sequential; a pipeline failure comes
/// back as an inline error and the session survives untouched.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<AskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| ApiError::NotFound("session not found".to_string()))?;

    let model = payload
        .model
        .unwrap_or_else(|| state.config.default_model.clone());

    let mut session = session.lock().await;
    let outcome = state
        .pipeline
        .run_turn(&mut session, &payload.question, &model)
        .await?;

    Ok(Json(json!({
        "answer": outcome.answer,
        "source": outcome.source,
    })))
}
