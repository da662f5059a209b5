//! Bounded context window for session histories.
//!
//! Histories are cut from the front: the newest tokens always survive.

use std::fmt;
use std::str::FromStr;

use chatforge_core::TokenId;

/// Default number of tokens kept per session.
pub const DEFAULT_WINDOW_SIZE: usize = 1000;

/// How a history longer than the window is cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TruncationPolicy {
    /// Keep the last `window_size` tokens, wherever the cut lands.
    #[default]
    Tokens,
    /// Like `Tokens`, then also drop a leading partial turn up to the first terminator.
    WholeTurns,
}

impl FromStr for TruncationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tokens" => Ok(Self::Tokens),
            "whole-turns" => Ok(Self::WholeTurns),
            other => Err(format!("unknown truncation policy '{other}'")),
        }
    }
}

impl fmt::Display for TruncationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokens => f.write_str("tokens"),
            Self::WholeTurns => f.write_str("whole-turns"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ContextWindow {
    pub window_size: usize,
    pub policy: TruncationPolicy,
    /// Token that ends a turn; only consulted by `WholeTurns`.
    pub terminator: TokenId,
}

impl ContextWindow {
    pub fn new(window_size: usize, policy: TruncationPolicy, terminator: TokenId) -> Self {
        Self {
            window_size,
            policy,
            terminator,
        }
    }

    /// Cut `tokens` down to at most `window_size`, dropping the oldest first.
    pub fn apply(&self, mut tokens: Vec<TokenId>) -> Vec<TokenId> {
        if tokens.len() <= self.window_size {
            return tokens;
        }

        let cut = tokens.len() - self.window_size;
        let landed_on_boundary = tokens[cut - 1] == self.terminator;
        tokens.drain(..cut);

        if self.policy == TruncationPolicy::WholeTurns && !landed_on_boundary {
            if let Some(pos) = tokens.iter().position(|&t| t == self.terminator) {
                tokens.drain(..=pos);
            }
        }

        tokens
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, TruncationPolicy::Tokens, 0)
    }
}
