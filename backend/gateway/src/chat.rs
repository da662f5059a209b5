//! `POST /chat` and `POST /reset`.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use chatforge_core::ChatError;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::server::GatewayState;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub user_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: String,
}

/// Handler for `POST /chat`
pub async fn chat(
    State(state): State<GatewayState>,
    JsonBody(payload): JsonBody<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user_id = state.session_id_for(payload.user_id);
    let message = payload.message.unwrap_or_default();

    let response = state.orchestrator.handle_turn(&user_id, &message).await?;
    Ok(Json(ChatResponse { response, user_id }))
}

/// Handler for `POST /reset`. An unknown user is reported, not treated as an error.
pub async fn reset(
    State(state): State<GatewayState>,
    JsonBody(payload): JsonBody<ResetRequest>,
) -> Result<Json<ResetResponse>, ApiError> {
    let user_id = state.session_id_for(payload.user_id);

    let message = match state.orchestrator.reset_session(&user_id).await {
        Ok(()) => format!("Conversation history for {user_id} has been reset"),
        Err(ChatError::NotFound(_)) => "No conversation history found for this user".to_string(),
        Err(other) => return Err(other.into()),
    };
    Ok(Json(ResetResponse { message }))
}
