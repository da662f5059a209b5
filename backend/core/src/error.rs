use thiserror::Error;

/// Top-level error type for the ChatForge runtime.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Bad or missing caller input. Always recoverable by fixing the request.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The completion engine could not produce a usable result for this turn.
    #[error("completion engine error: {0}")]
    Engine(#[from] EngineFailure),

    /// The referenced session is unknown. Informational, not a failure.
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChatError {
    /// Whether the caller should change the request rather than retry it later.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, ChatError::Validation(_))
    }
}

/// The ways a generation call can fail.
#[derive(Debug, Error)]
pub enum EngineFailure {
    #[error("generation timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("engine returned {returned_len} tokens for a {prompt_len}-token prompt")]
    Malformed {
        prompt_len: usize,
        returned_len: usize,
    },

    /// The engine queue is closed or every worker has exited.
    #[error("engine unavailable")]
    Unavailable,

    #[error("engine failed: {0}")]
    Failed(String),
}
