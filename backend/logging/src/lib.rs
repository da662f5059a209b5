//! Telemetry and structured logging for ChatForge.
//!
//! Console and rolling-file subscriber setup, turn event logging, and redaction of
//! message content before it reaches the logs.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, TurnEvent};
pub use logger::{LoggerSettings, init_logger};
pub use redact::redact_sensitive_data;
