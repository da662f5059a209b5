//! Turns a prepared `ChatForgeConfig` into running components.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use chatforge_agent::{
    ContextWindow, EngineQueue, Orchestrator, OrchestratorConfig, SessionStore,
    SessionStoreConfig, TruncationPolicy,
};
use chatforge_config::defaults::*;
use chatforge_config::ChatForgeConfig;
use chatforge_core::{ByteCodec, GenerationParams, TokenCodec};
use chatforge_engine::build_engines;
use chatforge_gateway::GatewayState;
use chatforge_logging::LoggerSettings;

/// Env var naming the config file when `--config` is not given.
pub const CONFIG_PATH_VAR: &str = "CHATFORGE_CONFIG";

/// `--config` wins over `CHATFORGE_CONFIG`; `None` means the default location.
pub fn config_path(flag: Option<PathBuf>) -> Option<PathBuf> {
    flag.or_else(|| {
        std::env::var(CONFIG_PATH_VAR)
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    })
}

pub fn logger_settings(config: &ChatForgeConfig) -> LoggerSettings {
    let logging = config.logging();
    LoggerSettings {
        level: logging.level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        json: logging.json.unwrap_or(false),
        dir: logging.dir.map(PathBuf::from),
    }
}

pub fn listen_addr(config: &ChatForgeConfig) -> Result<SocketAddr> {
    let server = config.server();
    let bind = server
        .bind_address
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("Invalid bind address '{bind}:{port}'"))
}

/// Build the session store, engine workers, and orchestrator behind the gateway.
/// Spawns the engine workers, so it must run inside a Tokio runtime.
pub fn build_state(config: &ChatForgeConfig) -> Result<GatewayState> {
    let codec: Arc<dyn TokenCodec> = Arc::new(ByteCodec::new());

    let session = config.session();
    let policy: TruncationPolicy = session
        .truncation
        .as_deref()
        .unwrap_or(DEFAULT_TRUNCATION)
        .parse()
        .map_err(anyhow::Error::msg)?;
    let window = ContextWindow::new(
        session.window_size.unwrap_or(DEFAULT_WINDOW_SIZE),
        policy,
        codec.terminator_token(),
    );
    let store = SessionStore::new(SessionStoreConfig {
        window,
        max_sessions: session.max_sessions,
        idle_ttl: session.idle_ttl_secs.map(Duration::from_secs),
    });

    let generation = config.generation();
    let engines = build_engines(&config.engine(), codec.terminator_token())?;
    let queue = EngineQueue::spawn(
        engines,
        generation.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
    );

    let params = GenerationParams {
        max_length: generation.max_length.unwrap_or(DEFAULT_MAX_LENGTH),
        temperature: generation.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        repetition_penalty: generation
            .repetition_penalty
            .unwrap_or(DEFAULT_REPETITION_PENALTY),
        ..GenerationParams::default()
    };
    let orchestrator = Orchestrator::new(
        store,
        codec,
        queue,
        OrchestratorConfig {
            params,
            timeout: Duration::from_secs(generation.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        },
    );

    let default_session = session
        .default_session_id
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
    Ok(GatewayState::new(Arc::new(orchestrator), &default_session))
}
