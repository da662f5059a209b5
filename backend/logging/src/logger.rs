//! Structured Logger
//!
//! Wraps `tracing` with a console layer (plain or JSON), an optional daily-rolling NDJSON
//! file layer, and `RUST_LOG`-overridable level control.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
pub struct LoggerSettings {
    /// Filter used when `RUST_LOG` is unset (e.g. "info", "chatforge_agent=debug").
    pub level: String,
    /// Emit console output as JSON instead of human-readable lines.
    pub json: bool,
    /// Directory for `chatforge.log.YYYY-MM-DD` files. `None` disables file output.
    pub dir: Option<PathBuf>,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

/// Initialize the global subscriber. Later calls are ignored.
pub fn init_logger(settings: &LoggerSettings) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let (plain_console, json_console) = if settings.json {
        (None, Some(fmt::layer().json().with_writer(std::io::stdout)))
    } else {
        (
            Some(
                fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(false)
                    .with_ansi(true),
            ),
            None,
        )
    };

    let file_layer = settings.dir.as_ref().map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, "chatforge.log");
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(plain_console)
        .with(json_console)
        .with(file_layer)
        .try_init();
}
