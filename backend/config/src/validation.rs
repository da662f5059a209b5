//! Config validation with field paths in every message.

use crate::schema::{ChatForgeConfig, EngineKind};
use thiserror::Error;

const TRUNCATION_POLICIES: &[&str] = &["tokens", "whole-turns"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &ChatForgeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_session(config, &mut report);
    validate_generation(config, &mut report);
    validate_engine(config, &mut report);
    report
}

fn validate_session(config: &ChatForgeConfig, report: &mut ValidationReport) {
    let Some(session) = &config.session else { return };
    if session.window_size == Some(0) {
        report.error("session.windowSize", "Window size must be at least 1 token");
    }
    if let Some(policy) = &session.truncation {
        if !TRUNCATION_POLICIES.contains(&policy.as_str()) {
            report.error(
                "session.truncation",
                format!("Unknown policy '{policy}'; expected one of {TRUNCATION_POLICIES:?}"),
            );
        }
    }
    if session.max_sessions == Some(0) {
        report.error("session.maxSessions", "Session cap must be at least 1 when set");
    }
    if session.idle_ttl_secs == Some(0) {
        report.warn("session.idleTtlSecs", "Sessions will expire immediately");
    }
    if let Some(id) = &session.default_session_id {
        if id.trim().is_empty() {
            report.error("session.defaultSessionId", "Default session id cannot be empty");
        }
    }
}

fn validate_generation(config: &ChatForgeConfig, report: &mut ValidationReport) {
    let Some(generation) = &config.generation else { return };
    if let Some(t) = generation.temperature {
        if t <= 0.0 {
            report.error("generation.temperature", "Temperature must be positive");
        }
    }
    if let Some(p) = generation.repetition_penalty {
        if p <= 0.0 {
            report.error("generation.repetitionPenalty", "Repetition penalty must be positive");
        }
    }
    if generation.timeout_secs == Some(0) {
        report.error("generation.timeoutSecs", "Timeout must be at least 1 second");
    }
    if generation.queue_capacity == Some(0) {
        report.error("generation.queueCapacity", "Queue capacity must be at least 1");
    }

    let window = config.session.as_ref().and_then(|s| s.window_size);
    if let (Some(max_length), Some(window)) = (generation.max_length, window) {
        if max_length < window {
            report.warn(
                "generation.maxLength",
                format!(
                    "maxLength ({max_length}) is below windowSize ({window}); long histories leave no room to generate"
                ),
            );
        }
    }
}

fn validate_engine(config: &ChatForgeConfig, report: &mut ValidationReport) {
    let Some(engine) = &config.engine else { return };
    if engine.workers == Some(0) {
        report.error("engine.workers", "At least one engine worker is required");
    }
    if engine.kind == Some(EngineKind::Http) {
        match engine.url.as_deref() {
            None | Some("") => report.error("engine.url", "HTTP engine requires a url"),
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                report.error("engine.url", format!("'{url}' is not an http(s) URL"));
            }
            Some(_) => {}
        }
    }
    if engine.kind == Some(EngineKind::Echo) && engine.url.is_some() {
        report.warn("engine.url", "url is ignored by the echo engine");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use crate::schema::{EngineConfig, GenerationConfig, SessionConfig};

    #[test]
    fn defaults_are_valid() {
        let report = validate(&apply_all_defaults(ChatForgeConfig::default()));
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn zero_window_is_rejected() {
        let cfg = ChatForgeConfig {
            session: Some(SessionConfig {
                window_size: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "session.windowSize");
    }

    #[test]
    fn unknown_truncation_policy_is_rejected() {
        let cfg = ChatForgeConfig {
            session: Some(SessionConfig {
                truncation: Some("sentences".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(!validate(&cfg).is_valid());
    }

    #[test]
    fn http_engine_needs_url() {
        let cfg = ChatForgeConfig {
            engine: Some(EngineConfig {
                kind: Some(EngineKind::Http),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "engine.url");
    }

    #[test]
    fn short_max_length_warns() {
        let cfg = ChatForgeConfig {
            session: Some(SessionConfig {
                window_size: Some(1000),
                ..Default::default()
            }),
            generation: Some(GenerationConfig {
                max_length: Some(200),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "generation.maxLength");
    }

    #[test]
    fn non_positive_sampling_values_are_rejected() {
        let cfg = ChatForgeConfig {
            generation: Some(GenerationConfig {
                temperature: Some(0.0),
                repetition_penalty: Some(-1.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(validate(&cfg).errors.len(), 2);
    }
}
