//! ChatForge Agent Runner
//!
//! Owns per-session token histories, serializes access to the completion engine, and
//! runs one chat turn end to end.

pub mod context_window;
pub mod engine_queue;
pub mod orchestrator;
pub mod session_state;
pub mod session_store;

pub use context_window::{ContextWindow, TruncationPolicy};
pub use engine_queue::EngineQueue;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use session_state::SessionState;
pub use session_store::{SessionLease, SessionStore, SessionStoreConfig};
