//! State held for one conversation.

use chatforge_core::{SessionId, TokenId};

/// Running token history of a session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: SessionId,
    /// Every prompt and response so far, oldest first.
    pub history: Vec<TokenId>,
    /// Turns completed since the session was created or last reset.
    pub turns: u64,
}

impl SessionState {
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
            history: Vec::new(),
            turns: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.turns = 0;
    }
}
