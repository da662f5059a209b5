//! `chatforge-config`: ChatForge runtime configuration.
//!
//! Provides:
//! - Typed config schema (server, session, generation, engine, logging)
//! - YAML loading from the platform config dir or an explicit path
//! - `${ENV_VAR}` substitution and `PORT` / `CHATFORGE_*` overrides
//! - Default value application
//! - Validation with per-field errors and warnings
//! - Redaction for safe logging

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, apply_env_overrides_with, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config};
pub use redact::redact;
pub use schema::{
    ChatForgeConfig, EngineConfig, EngineKind, GenerationConfig, LoggingConfig, ServerConfig,
    SessionConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// A loaded, defaulted, and validated config.
#[derive(Debug)]
pub struct PreparedConfig {
    pub config: ChatForgeConfig,
    /// The file the config was read from. It may not exist.
    pub path: PathBuf,
    /// Non-fatal findings for the caller to log.
    pub warnings: Vec<ConfigValidationError>,
}

/// Load, override from env, apply defaults, and validate a config file.
///
/// With no explicit path, `<config dir>/chatforge.yaml` is used. A missing file is not an
/// error. Any validation error fails the load.
pub async fn load_and_prepare(path: Option<&Path>) -> Result<PreparedConfig> {
    let path: PathBuf = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path(&config_dir()),
    };

    let config = load_config(&path).await?;
    let config = apply_env_overrides(config);
    let config = apply_all_defaults(config);

    let report = validate(&config);
    if !report.is_valid() {
        let details: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid configuration:\n  {}", details.join("\n  "));
    }

    Ok(PreparedConfig {
        config,
        path,
        warnings: report.warnings,
    })
}
