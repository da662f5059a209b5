use anyhow::Result;
use async_trait::async_trait;

use crate::types::{GenerationRequest, TokenId};

/// Converts text to token sequences and back.
///
/// Implementations hold no per-call state, so one codec is shared by every turn.
pub trait TokenCodec: Send + Sync {
    fn encode(&self, text: &str) -> Vec<TokenId>;

    /// Decode tokens to text, dropping special tokens when `skip_special` is set.
    fn decode(&self, tokens: &[TokenId], skip_special: bool) -> String;

    /// Token appended after every user turn.
    fn terminator_token(&self) -> TokenId;

    /// Token the engine pads with.
    fn pad_token(&self) -> TokenId;
}

/// A text-generation backend that extends a token sequence.
///
/// `generate` takes `&mut self`: an engine is not assumed to be safe for concurrent use,
/// so each instance is owned by exactly one queue worker.
#[async_trait]
pub trait CompletionEngine: Send {
    /// Engine name for logs (e.g., "echo", "http").
    fn name(&self) -> &str;

    /// Return the prompt followed by the generated continuation.
    async fn generate(&mut self, request: &GenerationRequest) -> Result<Vec<TokenId>>;
}
