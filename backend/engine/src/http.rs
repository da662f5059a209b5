use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use chatforge_core::{CompletionEngine, GenerationRequest, TokenId};

/// Remote text-generation service reached over HTTP.
///
/// Sends the prompt token ids to `{base_url}/generate` and expects the full sequences back.
pub struct HttpEngine {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpEngine {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for generation engine")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    input_ids: &'a [TokenId],
    max_length: usize,
    temperature: f32,
    repetition_penalty: f32,
    pad_token_id: TokenId,
    num_return_sequences: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    sequences: Vec<Vec<TokenId>>,
}

#[async_trait]
impl CompletionEngine for HttpEngine {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(&mut self, request: &GenerationRequest) -> Result<Vec<TokenId>> {
        let start = Instant::now();
        let params = &request.params;
        let body = GenerateRequest {
            input_ids: &request.prompt_tokens,
            max_length: params.max_length,
            temperature: params.temperature,
            repetition_penalty: params.repetition_penalty,
            pad_token_id: params.pad_token_id,
            num_return_sequences: params.num_return_sequences,
        };

        debug!(session = %request.session_id, prompt_len = request.prompt_len(), "Sending request to generation service");

        let mut builder = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context("Generation service HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Generation service returned {}: {}", status, error_body);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse generation service response")?;

        let sequence = parsed
            .sequences
            .into_iter()
            .next()
            .context("Generation service returned no sequences")?;

        debug!(
            returned_len = sequence.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Generation service responded"
        );
        Ok(sequence)
    }
}
