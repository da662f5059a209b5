//! Environment handling for config values.
//!
//! Two passes: `${VAR_NAME}` substitution inside string values of the config file, then
//! well-known variables (`PORT`, `CHATFORGE_*`) that override whole settings.
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are substituted; `$${VAR}` stays literal `${VAR}`.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::schema::{ChatForgeConfig, EngineConfig, LoggingConfig, ServerConfig, SessionConfig};

/// `${VAR}` with an optional leading `$` marking an escape.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

pub const PORT_VAR: &str = "PORT";
pub const BIND_VAR: &str = "CHATFORGE_BIND";
pub const WINDOW_SIZE_VAR: &str = "CHATFORGE_WINDOW_SIZE";
pub const ENGINE_URL_VAR: &str = "CHATFORGE_ENGINE_URL";
pub const LOG_LEVEL_VAR: &str = "CHATFORGE_LOG_LEVEL";

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute `${VAR}` references using a provided map.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute_value(value, env, "")?)
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                out.insert(k.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing = None;
    let out = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(out.into_owned()),
    }
}

/// Apply `PORT` and `CHATFORGE_*` overrides from the process environment.
pub fn apply_env_overrides(config: ChatForgeConfig) -> ChatForgeConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from a provided map. Unparseable values are ignored with a warning.
pub fn apply_env_overrides_with(
    mut config: ChatForgeConfig,
    env: &HashMap<String, String>,
) -> ChatForgeConfig {
    if let Some(port) = parse_var::<u16>(env, PORT_VAR) {
        config.server.get_or_insert_with(ServerConfig::default).port = Some(port);
    }
    if let Some(bind) = env.get(BIND_VAR).filter(|v| !v.is_empty()) {
        config
            .server
            .get_or_insert_with(ServerConfig::default)
            .bind_address = Some(bind.clone());
    }
    if let Some(window) = parse_var::<usize>(env, WINDOW_SIZE_VAR) {
        config
            .session
            .get_or_insert_with(SessionConfig::default)
            .window_size = Some(window);
    }
    if let Some(url) = env.get(ENGINE_URL_VAR).filter(|v| !v.is_empty()) {
        config.engine.get_or_insert_with(EngineConfig::default).url = Some(url.clone());
    }
    if let Some(level) = env.get(LOG_LEVEL_VAR).filter(|v| !v.is_empty()) {
        config.logging.get_or_insert_with(LoggingConfig::default).level = Some(level.clone());
    }
    config
}

fn parse_var<T: std::str::FromStr>(env: &HashMap<String, String>, name: &str) -> Option<T> {
    let raw = env.get(name)?;
    match raw.trim().parse() {
        Ok(v) => {
            debug!(var = name, "Applied env override");
            Some(v)
        }
        Err(_) => {
            warn!(var = name, value = %raw, "Ignoring unparseable env override");
            None
        }
    }
}
