use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::completion::CompletionError;
use crate::pipeline::PipelineError;
use crate::retrieval::RetrievalError;
use crate::warehouse::GatewayError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream failure: {0}")]
    BadGateway(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::BadGateway(err.to_string())
    }
}

/// Per-turn pipeline failures become inline API errors: invalid input is
/// the client's fault, collaborator failures are upstream, the rest are
/// server bugs.
impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match &err {
            PipelineError::EmptyQuestion => ApiError::BadRequest(err.to_string()),
            PipelineError::Completion(CompletionError::UnknownModel(_)) => {
                ApiError::BadRequest(err.to_string())
            }
            PipelineError::Completion(CompletionError::EmptyPrompt) => {
                ApiError::Internal(err.to_string())
            }
            PipelineError::Completion(_) => ApiError::BadGateway(err.to_string()),
            PipelineError::Retrieval(RetrievalError::Gateway(_)) => {
                ApiError::BadGateway(err.to_string())
            }
            PipelineError::Retrieval(_) => ApiError::Internal(err.to_string()),
        }
    }
}
