//! Config file location and loading.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::env::resolve_env_vars;
use crate::schema::ChatForgeConfig;

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "chatforge.yaml";

/// Resolve the ChatForge config directory.
/// Priority: `CHATFORGE_CONFIG_DIR` env > `<platform config dir>/chatforge` > `./.chatforge`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHATFORGE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::config_dir() {
        Some(base) => base.join("chatforge"),
        None => PathBuf::from(".chatforge"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the raw YAML document as a JSON value tree.
///
/// Returns an empty object if the file doesn't exist (first run).
pub async fn read_config_value(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    // A comment-only document parses as null.
    Ok(if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    })
}

/// Load a config file with `${VAR}` substitution applied.
pub async fn load_config(path: &Path) -> Result<ChatForgeConfig> {
    let value = read_config_value(path).await?;
    let value = resolve_env_vars(&value)
        .with_context(|| format!("Failed to resolve env vars in: {}", path.display()))?;
    let config: ChatForgeConfig = serde_json::from_value(value)
        .with_context(|| format!("Invalid config structure in: {}", path.display()))?;

    debug!(path = %path.display(), "Parsed config file");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("absent.yaml")).await.unwrap();
        assert_eq!(cfg, ChatForgeConfig::default());
    }

    #[tokio::test]
    async fn empty_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatforge.yaml");
        std::fs::write(&path, "").unwrap();
        let cfg = load_config(&path).await.unwrap();
        assert_eq!(cfg, ChatForgeConfig::default());
    }

    #[tokio::test]
    async fn loads_yaml_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "session:\n  windowSize: 42\n").unwrap();
        let cfg = load_config(&path).await.unwrap();
        assert_eq!(cfg.session().window_size, Some(42));
    }

    #[tokio::test]
    async fn invalid_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "server: [unclosed").unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config YAML"));
    }
}
