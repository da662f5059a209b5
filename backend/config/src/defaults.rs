//! Config defaults: applies default values to a parsed config.

use crate::schema::{
    ChatForgeConfig, EngineConfig, EngineKind, GenerationConfig, LoggingConfig, ServerConfig,
    SessionConfig,
};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 5000;

/// Tokens of history kept per session.
pub const DEFAULT_WINDOW_SIZE: usize = 1000;

pub const DEFAULT_TRUNCATION: &str = "tokens";

pub const DEFAULT_SESSION_ID: &str = "default";

/// Maximum total generated sequence length.
pub const DEFAULT_MAX_LENGTH: usize = 1000;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_REPETITION_PENALTY: f32 = 1.1;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

pub const DEFAULT_ENGINE_WORKERS: usize = 1;

pub const DEFAULT_ENGINE_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ChatForgeConfig) -> ChatForgeConfig {
    let config = apply_server_defaults(config);
    let config = apply_session_defaults(config);
    let config = apply_generation_defaults(config);
    let config = apply_engine_defaults(config);
    apply_logging_defaults(config)
}

fn apply_server_defaults(mut config: ChatForgeConfig) -> ChatForgeConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    server
        .bind_address
        .get_or_insert_with(|| DEFAULT_BIND_ADDRESS.to_string());
    server.port.get_or_insert(DEFAULT_PORT);
    config
}

/// Eviction settings stay unset: sessions are kept until restart unless configured.
fn apply_session_defaults(mut config: ChatForgeConfig) -> ChatForgeConfig {
    let session = config.session.get_or_insert_with(SessionConfig::default);
    session.window_size.get_or_insert(DEFAULT_WINDOW_SIZE);
    session
        .truncation
        .get_or_insert_with(|| DEFAULT_TRUNCATION.to_string());
    session
        .default_session_id
        .get_or_insert_with(|| DEFAULT_SESSION_ID.to_string());
    config
}

fn apply_generation_defaults(mut config: ChatForgeConfig) -> ChatForgeConfig {
    let generation = config.generation.get_or_insert_with(GenerationConfig::default);
    generation.max_length.get_or_insert(DEFAULT_MAX_LENGTH);
    generation.temperature.get_or_insert(DEFAULT_TEMPERATURE);
    generation
        .repetition_penalty
        .get_or_insert(DEFAULT_REPETITION_PENALTY);
    generation.timeout_secs.get_or_insert(DEFAULT_TIMEOUT_SECS);
    generation.queue_capacity.get_or_insert(DEFAULT_QUEUE_CAPACITY);
    config
}

fn apply_engine_defaults(mut config: ChatForgeConfig) -> ChatForgeConfig {
    let engine = config.engine.get_or_insert_with(EngineConfig::default);
    engine.kind.get_or_insert(EngineKind::Echo);
    engine.workers.get_or_insert(DEFAULT_ENGINE_WORKERS);
    engine
        .request_timeout_secs
        .get_or_insert(DEFAULT_ENGINE_REQUEST_TIMEOUT_SECS);
    config
}

fn apply_logging_defaults(mut config: ChatForgeConfig) -> ChatForgeConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);
    config
}
