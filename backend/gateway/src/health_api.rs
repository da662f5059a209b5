//! Gateway Health API

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub model_loaded: bool,
    pub active_conversations: usize,
}

/// Handler for `GET /health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "healthy",
        model_loaded: state.orchestrator.engine_ready(),
        active_conversations: state.orchestrator.active_sessions(),
    })
}
