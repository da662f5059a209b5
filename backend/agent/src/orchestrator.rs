//! Chat turn orchestration.
//!
//! One turn: lock the session, build the prompt from history plus the encoded message,
//! run it through the engine queue, decode the continuation, and write the full sequence
//! back. The session stays locked for the whole turn, so turns for one session run one
//! at a time while other sessions proceed independently.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use chatforge_core::{
    ChatError, EngineFailure, GenerationParams, GenerationRequest, TokenCodec, TokenId,
};
use chatforge_logging::{EventLogger, TurnEvent};

use crate::engine_queue::EngineQueue;
use crate::session_store::SessionStore;

/// Default upper bound on a single generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Sent with every request. `pad_token_id` is overwritten from the codec.
    pub params: GenerationParams,
    pub timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            params: GenerationParams::default(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

pub struct Orchestrator {
    store: SessionStore,
    codec: Arc<dyn TokenCodec>,
    engine: EngineQueue,
    params: GenerationParams,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        store: SessionStore,
        codec: Arc<dyn TokenCodec>,
        engine: EngineQueue,
        config: OrchestratorConfig,
    ) -> Self {
        let params = GenerationParams {
            pad_token_id: codec.pad_token(),
            ..config.params
        };
        Self {
            store,
            codec,
            engine,
            params,
            timeout: config.timeout,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Run one chat turn and return the decoded response.
    ///
    /// History is only written when the engine returns a well-formed sequence; any
    /// failure leaves the session exactly as it was.
    #[instrument(skip(self, text), fields(session_id = %session_id))]
    pub async fn handle_turn(&self, session_id: &str, text: &str) -> Result<String, ChatError> {
        if text.is_empty() {
            return Err(ChatError::Validation("message is required".into()));
        }

        EventLogger::log_event(
            session_id,
            TurnEvent::TurnReceived {
                content: text.to_string(),
            },
        );

        let mut lease = self.store.checkout(session_id).await;

        let prompt = self.build_prompt(lease.history(), text);
        let prompt_len = prompt.len();
        let request = GenerationRequest::new(session_id, prompt, self.params.clone());

        let started = Instant::now();
        let full_sequence = match tokio::time::timeout(self.timeout, self.engine.submit(request)).await {
            Ok(Ok(tokens)) => tokens,
            Ok(Err(failure)) => return Err(self.turn_failed(session_id, failure)),
            Err(_) => {
                let after_ms = self.timeout.as_millis() as u64;
                warn!(after_ms, "Generation timed out");
                return Err(self.turn_failed(session_id, EngineFailure::Timeout { after_ms }));
            }
        };

        if full_sequence.len() < prompt_len {
            return Err(self.turn_failed(
                session_id,
                EngineFailure::Malformed {
                    prompt_len,
                    returned_len: full_sequence.len(),
                },
            ));
        }

        let response = self.codec.decode(&full_sequence[prompt_len..], true);
        let generated = full_sequence.len() - prompt_len;
        lease.commit(full_sequence);

        let latency_ms = started.elapsed().as_millis() as u64;
        info!(
            prompt_len,
            generated,
            history_len = lease.history().len(),
            latency_ms,
            "Turn completed"
        );
        EventLogger::log_event(
            session_id,
            TurnEvent::TurnCompleted {
                content: response.clone(),
                prompt_tokens: prompt_len,
                generated_tokens: generated,
                latency_ms,
            },
        );

        Ok(response)
    }

    /// Clear a session's history. Unknown sessions yield `ChatError::NotFound`.
    pub async fn reset_session(&self, session_id: &str) -> Result<(), ChatError> {
        if self.store.reset(session_id).await {
            info!(session_id, "Reset conversation");
            EventLogger::log_event(session_id, TurnEvent::SessionReset);
            Ok(())
        } else {
            Err(ChatError::NotFound(session_id.to_string()))
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.store.count()
    }

    pub fn engine_ready(&self) -> bool {
        self.engine.is_running()
    }

    fn build_prompt(&self, history: &[TokenId], text: &str) -> Vec<TokenId> {
        let turn = self.codec.encode(text);
        let mut prompt = Vec::with_capacity(history.len() + turn.len() + 1);
        prompt.extend_from_slice(history);
        prompt.extend(turn);
        prompt.push(self.codec.terminator_token());
        prompt
    }

    fn turn_failed(&self, session_id: &str, failure: EngineFailure) -> ChatError {
        error!(error = %failure, "Turn failed; history left unchanged");
        EventLogger::log_event(
            session_id,
            TurnEvent::TurnFailed {
                error_msg: failure.to_string(),
            },
        );
        ChatError::Engine(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_window::{ContextWindow, TruncationPolicy};
    use crate::session_store::SessionStoreConfig;
    use anyhow::bail;
    use async_trait::async_trait;
    use chatforge_core::codec::END_OF_TURN;
    use chatforge_core::{ByteCodec, CompletionEngine};
    use std::sync::Mutex as StdMutex;

    /// Replies with a fixed continuation and records every prompt it sees.
    struct ScriptedEngine {
        reply: Vec<TokenId>,
        prompts: Arc<StdMutex<Vec<Vec<TokenId>>>>,
    }

    #[async_trait]
    impl CompletionEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&mut self, request: &GenerationRequest) -> anyhow::Result<Vec<TokenId>> {
            self.prompts.lock().unwrap().push(request.prompt_tokens.clone());
            let mut out = request.prompt_tokens.clone();
            out.extend_from_slice(&self.reply);
            Ok(out)
        }
    }

    enum Misbehaviour {
        Fail,
        Truncate,
        Stall,
    }

    struct FaultyEngine(Misbehaviour);

    #[async_trait]
    impl CompletionEngine for FaultyEngine {
        fn name(&self) -> &str {
            "faulty"
        }

        async fn generate(&mut self, request: &GenerationRequest) -> anyhow::Result<Vec<TokenId>> {
            match self.0 {
                Misbehaviour::Fail => bail!("CUDA out of memory"),
                Misbehaviour::Truncate => Ok(request.prompt_tokens[..1].to_vec()),
                Misbehaviour::Stall => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(request.prompt_tokens.clone())
                }
            }
        }
    }

    fn reply_tokens(text: &str) -> Vec<TokenId> {
        let mut tokens = ByteCodec.encode(text);
        tokens.push(END_OF_TURN);
        tokens
    }

    fn orchestrator(engine: Box<dyn CompletionEngine>, window_size: usize, timeout: Duration) -> Orchestrator {
        let store = SessionStore::new(SessionStoreConfig {
            window: ContextWindow::new(window_size, TruncationPolicy::Tokens, END_OF_TURN),
            ..Default::default()
        });
        Orchestrator::new(
            store,
            Arc::new(ByteCodec),
            EngineQueue::spawn(vec![engine], 8),
            OrchestratorConfig {
                timeout,
                ..Default::default()
            },
        )
    }

    fn scripted(reply: &str) -> (Box<dyn CompletionEngine>, Arc<StdMutex<Vec<Vec<TokenId>>>>) {
        let prompts = Arc::new(StdMutex::new(Vec::new()));
        let engine = ScriptedEngine {
            reply: reply_tokens(reply),
            prompts: Arc::clone(&prompts),
        };
        (Box::new(engine), prompts)
    }

    #[tokio::test]
    async fn two_turns_then_reset() {
        let (engine, prompts) = scripted("hi there");
        let orch = orchestrator(engine, 1000, DEFAULT_GENERATION_TIMEOUT);

        let reply = orch.handle_turn("u1", "hello").await.unwrap();
        assert_eq!(reply, "hi there");
        let after_first = orch.store().get("u1").await;
        assert!(!after_first.is_empty());

        orch.handle_turn("u1", "how are you").await.unwrap();
        let seen = prompts.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        // First prompt is the bare turn plus terminator.
        assert_eq!(seen[0], reply_tokens("hello"));
        // Second prompt extends the first exchange.
        assert!(seen[1].starts_with(&after_first));
        assert!(seen[1].ends_with(&reply_tokens("how are you")));

        orch.reset_session("u1").await.unwrap();
        assert!(orch.store().get("u1").await.is_empty());
        assert_eq!(orch.active_sessions(), 1);
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_engine_call() {
        let (engine, prompts) = scripted("unused");
        let orch = orchestrator(engine, 1000, DEFAULT_GENERATION_TIMEOUT);
        orch.store().put("u1", vec![1, 2, 3]).await;

        let err = orch.handle_turn("u1", "").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert_eq!(orch.store().get("u1").await, vec![1, 2, 3]);
        assert!(prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn engine_error_leaves_history_unchanged() {
        let orch = orchestrator(Box::new(FaultyEngine(Misbehaviour::Fail)), 1000, DEFAULT_GENERATION_TIMEOUT);
        orch.store().put("u1", vec![9, 9]).await;

        let err = orch.handle_turn("u1", "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Engine(EngineFailure::Failed(_))));
        assert_eq!(orch.store().get("u1").await, vec![9, 9]);
    }

    #[tokio::test]
    async fn short_engine_output_is_malformed() {
        let orch = orchestrator(Box::new(FaultyEngine(Misbehaviour::Truncate)), 1000, DEFAULT_GENERATION_TIMEOUT);
        orch.store().put("u1", vec![4]).await;

        let err = orch.handle_turn("u1", "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Engine(EngineFailure::Malformed { .. })));
        assert_eq!(orch.store().get("u1").await, vec![4]);
    }

    #[tokio::test]
    async fn slow_engine_times_out() {
        let orch = orchestrator(
            Box::new(FaultyEngine(Misbehaviour::Stall)),
            1000,
            Duration::from_millis(50),
        );

        let err = orch.handle_turn("u1", "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Engine(EngineFailure::Timeout { after_ms: 50 })));
        assert!(orch.store().get("u1").await.is_empty());
    }

    #[tokio::test]
    async fn history_never_exceeds_window() {
        let (engine, _) = scripted("a fairly long reply from the engine");
        let orch = orchestrator(engine, 32, DEFAULT_GENERATION_TIMEOUT);

        for i in 0..20 {
            orch.handle_turn("u1", &format!("message number {i}")).await.unwrap();
            assert!(orch.store().get("u1").await.len() <= 32);
        }
    }

    #[tokio::test]
    async fn concurrent_turns_on_one_session_do_not_lose_updates() {
        let (engine, _) = scripted("k");
        let orch = Arc::new(orchestrator(engine, 10_000, DEFAULT_GENERATION_TIMEOUT));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let orch = Arc::clone(&orch);
            handles.push(tokio::spawn(async move { orch.handle_turn("u1", "x").await }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), "k");
        }

        // Each turn adds "x" + terminator + "k" + terminator.
        assert_eq!(orch.store().get("u1").await.len(), 8 * 4);
        assert_eq!(orch.store().checkout("u1").await.turns(), 8);
    }

    #[tokio::test]
    async fn counts_distinct_sessions() {
        let (engine, _) = scripted("ok");
        let orch = orchestrator(engine, 1000, DEFAULT_GENERATION_TIMEOUT);

        for id in ["a", "b", "c", "a"] {
            orch.handle_turn(id, "hi").await.unwrap();
        }
        assert_eq!(orch.active_sessions(), 3);
        assert!(orch.engine_ready());
    }

    #[tokio::test]
    async fn reset_unknown_session_is_not_found() {
        let (engine, _) = scripted("ok");
        let orch = orchestrator(engine, 1000, DEFAULT_GENERATION_TIMEOUT);

        let err = orch.reset_session("ghost").await.unwrap_err();
        assert!(matches!(err, ChatError::NotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn pad_token_comes_from_codec() {
        let (engine, _) = scripted("ok");
        let orch = orchestrator(engine, 1000, DEFAULT_GENERATION_TIMEOUT);
        assert_eq!(orch.params.pad_token_id, END_OF_TURN);
    }
}
