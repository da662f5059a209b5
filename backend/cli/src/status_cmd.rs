//! `chatforge status`: query a running gateway's `/health` endpoint.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::terminal_output::{key_value, note_error, note_info, note_warn, yes_no};

#[derive(Debug, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub model_loaded: bool,
    pub active_conversations: u64,
}

pub async fn fetch_health(base_url: &str) -> Result<HealthReport> {
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("Failed to reach {url}"))?
        .error_for_status()?;
    response
        .json()
        .await
        .context("Failed to parse health response")
}

pub async fn run(port: u16) -> Result<()> {
    let base_url = format!("http://localhost:{port}");
    note_info(&format!("Checking ChatForge at {base_url}"));

    match fetch_health(&base_url).await {
        Ok(report) => {
            println!("{}", key_value("status", &report.status, 22));
            println!("{}", key_value("model loaded", &yes_no(report.model_loaded), 22));
            println!(
                "{}",
                key_value("active conversations", &report.active_conversations.to_string(), 22)
            );
            if !report.model_loaded {
                note_warn("No engine worker is running; chat requests will fail");
            }
        }
        Err(e) => {
            note_error(&format!("ChatForge is not running on port {port}: {e:#}"));
        }
    }
    Ok(())
}
