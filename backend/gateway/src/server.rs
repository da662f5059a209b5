//! Main HTTP Gateway Server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use chatforge_agent::Orchestrator;

use crate::{chat, control_ui, health_api};

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
    default_session_id: Arc<str>,
}

impl GatewayState {
    pub fn new(orchestrator: Arc<Orchestrator>, default_session_id: &str) -> Self {
        Self {
            orchestrator,
            default_session_id: Arc::from(default_session_id),
        }
    }

    /// The caller's session id, or the default when none was given.
    pub fn session_id_for(&self, user_id: Option<String>) -> String {
        user_id.unwrap_or_else(|| self.default_session_id.to_string())
    }
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(control_ui::index))
        .route("/chat", post(chat::chat))
        .route("/reset", post(chat::reset))
        .route("/health", get(health_api::get_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the gateway until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
