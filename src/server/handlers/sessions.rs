use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub use_history: Option<bool>,
    pub use_rag: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub use_history: Option<bool>,
    pub use_rag: Option<bool>,
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.sessions.list().await;
    Ok(Json(json!({ "sessions": sessions })))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .sessions
        .create(
            payload.use_history.unwrap_or(true),
            payload.use_rag.unwrap_or(true),
        )
        .await;
    Ok(Json(json!({ "session": summary })))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| ApiError::NotFound("session not found".to_string()))?;

    let session = session.lock().await;
    Ok(Json(json!({
        "id": session.id,
        "use_history": session.use_history,
        "use_rag": session.use_rag,
        "created_at": session.created_at,
        "messages": session.transcript.turns(),
    })))
}

pub async fn update_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<UpdateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| ApiError::NotFound("session not found".to_string()))?;

    let mut session = session.lock().await;
    if let Some(use_history) = payload.use_history {
        session.use_history = use_history;
    }
    if let Some(use_rag) = payload.use_rag {
        session.use_rag = use_rag;
    }
    Ok(Json(json!({ "success": true })))
}

/// The explicit clear-conversation signal; the transcript is never reset
/// any other way.
pub async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| ApiError::NotFound("session not found".to_string()))?;

    session.lock().await.transcript.clear();
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.sessions.remove(&session_id).await {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::NotFound("session not found".to_string()))
    }
}
