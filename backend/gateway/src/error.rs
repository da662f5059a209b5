//! Mapping from turn errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use chatforge_core::ChatError;

/// Errors a handler can return. Internal detail is logged, never sent.
#[derive(Debug)]
pub enum ApiError {
    /// The message field was missing or empty.
    MissingMessage,
    /// The body was not valid JSON of the expected shape.
    MalformedBody,
    Internal,
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(_) => ApiError::MissingMessage,
            other => {
                error!(error = %other, "Request failed");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingMessage => (StatusCode::BAD_REQUEST, "Message is required"),
            ApiError::MalformedBody => (StatusCode::BAD_REQUEST, "Invalid JSON body"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
