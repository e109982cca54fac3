//! Turn-level streaming events.
//!
//! A turn emits any number of `text_delta` and `block` events followed by
//! exactly one terminal event, `done` or `error`. Nothing follows the
//! terminal event.

use orderchat_core::ui::UiBlock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted by the orchestrator while a turn runs.
///
/// - `text_delta`: a fragment of the streamed summary
/// - `block`: a complete UI block
/// - `error`: the turn failed (terminal)
/// - `done`: the turn succeeded (terminal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    TextDelta { delta: String },

    Block { block: UiBlock },

    Error { message: String },

    Done,
}

impl StreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TextDelta { .. } => "text_delta",
            Self::Block { .. } => "block",
            Self::Error { .. } => "error",
            Self::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// An event stream that fails immediately, for turns that could not start
/// (e.g. the model is not configured).
pub fn error_stream(message: impl Into<String>) -> mpsc::Receiver<StreamEvent> {
    let (tx, rx) = mpsc::channel(1);
    // Capacity 1 and a fresh channel: this cannot fail.
    let _ = tx.try_send(StreamEvent::error(message));
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_text_delta() {
        let event = StreamEvent::TextDelta {
            delta: "You have".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"text_delta","delta":"You have"}"#);
    }

    #[test]
    fn event_serialization_block() {
        let event = StreamEvent::Block {
            block: UiBlock::UiResource {
                resource_id: "order_table".into(),
                data: serde_json::json!({"orders": []}),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "block");
        assert_eq!(json["block"]["type"], "ui_resource");
        assert_eq!(json["block"]["resourceId"], "order_table");
    }

    #[test]
    fn event_serialization_terminals() {
        assert_eq!(
            serde_json::to_string(&StreamEvent::Done).unwrap(),
            r#"{"type":"done"}"#
        );
        let json = serde_json::to_string(&StreamEvent::error("boom")).unwrap();
        assert_eq!(json, r#"{"type":"error","message":"boom"}"#);
    }

    #[test]
    fn event_type_names() {
        assert_eq!(
            StreamEvent::TextDelta { delta: "x".into() }.event_type(),
            "text_delta"
        );
        assert_eq!(
            StreamEvent::Block {
                block: UiBlock::text("x")
            }
            .event_type(),
            "block"
        );
        assert_eq!(StreamEvent::error("x").event_type(), "error");
        assert_eq!(StreamEvent::Done.event_type(), "done");
    }

    #[test]
    fn terminal_events() {
        assert!(StreamEvent::Done.is_terminal());
        assert!(StreamEvent::error("x").is_terminal());
        assert!(!StreamEvent::TextDelta { delta: "x".into() }.is_terminal());
    }

    #[test]
    fn event_deserialization() {
        let event: StreamEvent = serde_json::from_str(r#"{"type":"done"}"#).unwrap();
        assert_eq!(event, StreamEvent::Done);
    }

    #[tokio::test]
    async fn error_stream_yields_single_terminal() {
        let mut rx = error_stream("no model API key configured");
        assert_eq!(
            rx.recv().await,
            Some(StreamEvent::error("no model API key configured"))
        );
        assert_eq!(rx.recv().await, None);
    }
}
