use serde::{Deserialize, Serialize};

/// A single token identifier produced by a [`TokenCodec`](crate::TokenCodec).
pub type TokenId = u32;

/// Opaque, caller-supplied conversation key.
pub type SessionId = String;

/// Session used when the caller does not name one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Fixed sampling parameters sent with every generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum total length of the returned sequence (prompt included).
    pub max_length: usize,
    pub temperature: f32,
    pub repetition_penalty: f32,
    pub pad_token_id: TokenId,
    pub num_return_sequences: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 1000,
            temperature: 0.7,
            repetition_penalty: 1.1,
            pad_token_id: 0,
            num_return_sequences: 1,
        }
    }
}

/// One request to the completion engine. Built fresh per turn and dropped afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub session_id: SessionId,
    pub prompt_tokens: Vec<TokenId>,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(
        session_id: impl Into<SessionId>,
        prompt_tokens: Vec<TokenId>,
        params: GenerationParams,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            prompt_tokens,
            params,
        }
    }

    pub fn prompt_len(&self) -> usize {
        self.prompt_tokens.len()
    }
}
