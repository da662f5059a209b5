//! Concrete completion engines and the factory that builds one per queue worker.

pub mod echo;
pub mod http;

pub use echo::EchoEngine;
pub use http::HttpEngine;

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use chatforge_config::defaults::{DEFAULT_ENGINE_REQUEST_TIMEOUT_SECS, DEFAULT_ENGINE_WORKERS};
use chatforge_config::{EngineConfig, EngineKind};
use chatforge_core::{CompletionEngine, TokenId};

/// Build `workers` engine handles of the configured kind.
pub fn build_engines(
    config: &EngineConfig,
    terminator: TokenId,
) -> Result<Vec<Box<dyn CompletionEngine>>> {
    let kind = config.kind.unwrap_or_default();
    let workers = config.workers.unwrap_or(DEFAULT_ENGINE_WORKERS).max(1);

    let mut engines: Vec<Box<dyn CompletionEngine>> = Vec::with_capacity(workers);
    for _ in 0..workers {
        let engine: Box<dyn CompletionEngine> = match kind {
            EngineKind::Echo => Box::new(EchoEngine::new(terminator)),
            EngineKind::Http => {
                let url = config
                    .url
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .context("engine.url is required for the http engine")?;
                let timeout = Duration::from_secs(
                    config
                        .request_timeout_secs
                        .unwrap_or(DEFAULT_ENGINE_REQUEST_TIMEOUT_SECS),
                );
                Box::new(HttpEngine::new(url, config.api_key.clone(), timeout)?)
            }
        };
        engines.push(engine);
    }

    info!(kind = ?kind, workers, "Built completion engines");
    Ok(engines)
}
