//! Turn Event Logger
//!
//! Structured per-turn events (received, completed, failed, reset) emitted through
//! `tracing` under the `turn_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TurnEvent {
    TurnReceived {
        content: String,
    },
    TurnCompleted {
        content: String,
        prompt_tokens: usize,
        generated_tokens: usize,
        latency_ms: u64,
    },
    TurnFailed {
        error_msg: String,
    },
    SessionReset,
}

impl TurnEvent {
    fn redacted(mut self) -> Self {
        match &mut self {
            TurnEvent::TurnReceived { content } | TurnEvent::TurnCompleted { content, .. } => {
                *content = redact_sensitive_data(content);
            }
            TurnEvent::TurnFailed { error_msg } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            TurnEvent::SessionReset => {}
        }
        self
    }
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: TurnEvent,
}

impl EventLogEntry {
    pub fn new(session_id: &str, event: TurnEvent) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event: event.redacted(),
        }
    }
}

pub struct EventLogger;

impl EventLogger {
    /// Redact the event's text and emit it as one structured record.
    pub fn log_event(session_id: &str, event: TurnEvent) {
        let entry = EventLogEntry::new(session_id, event);
        match serde_json::to_string(&entry) {
            Ok(json) => info!(target: "turn_events", session_id = %entry.session_id, event = %json, "Turn event"),
            Err(_) => info!(target: "turn_events", session_id = %entry.session_id, event = ?entry, "Turn event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_redacts_message_content() {
        let entry = EventLogEntry::new(
            "u1",
            TurnEvent::TurnReceived {
                content: "call me at +1-555-123-4567".into(),
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["session_id"], "u1");
        assert_eq!(json["event"]["type"], "TurnReceived");
        assert!(!json["event"]["content"].as_str().unwrap().contains("555-123-4567"));
    }

    #[test]
    fn completed_event_serializes_counts() {
        let entry = EventLogEntry::new(
            "u2",
            TurnEvent::TurnCompleted {
                content: "hi there".into(),
                prompt_tokens: 6,
                generated_tokens: 9,
                latency_ms: 12,
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["content"], "hi there");
        assert_eq!(json["event"]["prompt_tokens"], 6);
        assert_eq!(json["event"]["generated_tokens"], 9);
    }

    #[test]
    fn reset_event_has_only_tag() {
        let json = serde_json::to_value(TurnEvent::SessionReset).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "SessionReset" }));
    }
}
