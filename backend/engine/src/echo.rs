use anyhow::Result;
use async_trait::async_trait;

use chatforge_core::{CompletionEngine, GenerationRequest, TokenId};

/// Offline engine that answers each turn with the turn itself.
///
/// The reply is the last user turn (the tokens after the previous terminator) followed by the
/// terminator, cut so the whole sequence never exceeds `max_length`.
pub struct EchoEngine {
    terminator: TokenId,
}

impl EchoEngine {
    pub fn new(terminator: TokenId) -> Self {
        Self { terminator }
    }

    fn last_turn<'a>(&self, prompt: &'a [TokenId]) -> &'a [TokenId] {
        let body = match prompt.last() {
            Some(&t) if t == self.terminator => &prompt[..prompt.len() - 1],
            _ => prompt,
        };
        let start = body
            .iter()
            .rposition(|&t| t == self.terminator)
            .map_or(0, |i| i + 1);
        &body[start..]
    }
}

#[async_trait]
impl CompletionEngine for EchoEngine {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&mut self, request: &GenerationRequest) -> Result<Vec<TokenId>> {
        let prompt = &request.prompt_tokens;
        let mut out = prompt.clone();
        out.extend_from_slice(self.last_turn(prompt));
        out.push(self.terminator);

        let limit = request.params.max_length.max(prompt.len());
        out.truncate(limit);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatforge_core::GenerationParams;

    const EOT: TokenId = 256;

    fn request(prompt: Vec<TokenId>, max_length: usize) -> GenerationRequest {
        let params = GenerationParams {
            max_length,
            ..Default::default()
        };
        GenerationRequest::new("u1", prompt, params)
    }

    #[tokio::test]
    async fn echoes_last_turn_only() {
        let mut engine = EchoEngine::new(EOT);
        let req = request(vec![1, 2, EOT, 9, 9, EOT, 3, 4, EOT], 100);
        let out = engine.generate(&req).await.unwrap();
        assert_eq!(&out[..9], req.prompt_tokens.as_slice());
        assert_eq!(&out[9..], &[3, 4, EOT]);
    }

    #[tokio::test]
    async fn first_turn_echoes_everything() {
        let mut engine = EchoEngine::new(EOT);
        let out = engine.generate(&request(vec![7, 8, EOT], 100)).await.unwrap();
        assert_eq!(out, vec![7, 8, EOT, 7, 8, EOT]);
    }

    #[tokio::test]
    async fn honours_max_length_without_cutting_prompt() {
        let mut engine = EchoEngine::new(EOT);
        let out = engine.generate(&request(vec![1, 2, 3, EOT], 5)).await.unwrap();
        assert_eq!(out, vec![1, 2, 3, EOT, 1]);

        let out = engine.generate(&request(vec![1, 2, 3, EOT], 2)).await.unwrap();
        assert_eq!(out, vec![1, 2, 3, EOT]);
    }
}
