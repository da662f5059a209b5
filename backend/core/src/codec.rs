//! Built-in byte-level token codec.
//!
//! Every UTF-8 byte maps to the token with the same value. One extra id marks the end of
//! a turn and doubles as the pad token.

use crate::traits::TokenCodec;
use crate::types::TokenId;

/// End-of-turn token id. Sits just past the byte range.
pub const END_OF_TURN: TokenId = 256;

#[derive(Debug, Clone, Copy, Default)]
pub struct ByteCodec;

impl ByteCodec {
    pub fn new() -> Self {
        Self
    }

    fn is_special(token: TokenId) -> bool {
        token > u8::MAX as TokenId
    }
}

impl TokenCodec for ByteCodec {
    fn encode(&self, text: &str) -> Vec<TokenId> {
        text.bytes().map(TokenId::from).collect()
    }

    fn decode(&self, tokens: &[TokenId], skip_special: bool) -> String {
        let mut bytes = Vec::with_capacity(tokens.len());
        for &token in tokens {
            if Self::is_special(token) {
                if !skip_special {
                    // No byte form; emit a line break so turns stay readable.
                    bytes.push(b'\n');
                }
                continue;
            }
            bytes.push(token as u8);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn terminator_token(&self) -> TokenId {
        END_OF_TURN
    }

    fn pad_token(&self) -> TokenId {
        END_OF_TURN
    }
}
