//! Server-sent event framing for turn events.
//!
//! Each [`StreamEvent`] becomes one frame with `event: <type>` and the tagged
//! JSON as `data:`. The frame stream always ends with exactly one terminal
//! frame: if the turn's channel closes without one, an `error` frame is
//! appended; anything after a terminal event is dropped.

use std::convert::Infallible;

use axum::response::sse::{Event as SseEvent, Sse};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use orderchat_agent::StreamEvent;

const UNTERMINATED: &str = "Turn ended without a terminal event";

/// Wrap a turn's event channel as an SSE response body.
pub fn sse_response(
    events: mpsc::Receiver<StreamEvent>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let frames = ensure_terminal(ReceiverStream::new(events)).map(|event| Ok(to_frame(&event)));
    Sse::new(frames)
}

/// Serialize one event as an SSE frame.
pub fn to_frame(event: &StreamEvent) -> SseEvent {
    let data = serde_json::to_string(event).unwrap_or_default();
    SseEvent::default().event(event.event_type()).data(data)
}

/// Cut the stream after its first terminal event, or append an `error`
/// event if it ends without one.
pub fn ensure_terminal<S>(events: S) -> impl Stream<Item = StreamEvent>
where
    S: Stream<Item = StreamEvent> + Unpin,
{
    futures::stream::unfold(Some(events), |state| async move {
        let mut events = state?;
        match events.next().await {
            Some(event) if event.is_terminal() => Some((event, None)),
            Some(event) => Some((event, Some(events))),
            None => Some((StreamEvent::error(UNTERMINATED), None)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderchat_core::ui::UiBlock;

    async fn collect(events: Vec<StreamEvent>) -> Vec<StreamEvent> {
        ensure_terminal(tokio_stream::iter(events)).collect().await
    }

    #[tokio::test]
    async fn passes_through_terminated_stream() {
        let events = vec![
            StreamEvent::TextDelta { delta: "a".into() },
            StreamEvent::Done,
        ];
        assert_eq!(collect(events.clone()).await, events);
    }

    #[tokio::test]
    async fn appends_error_to_unterminated_stream() {
        let out = collect(vec![StreamEvent::Block {
            block: UiBlock::text("partial"),
        }])
        .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], StreamEvent::error(UNTERMINATED));
    }

    #[tokio::test]
    async fn empty_stream_becomes_single_error() {
        let out = collect(Vec::new()).await;
        assert_eq!(out, vec![StreamEvent::error(UNTERMINATED)]);
    }

    #[tokio::test]
    async fn drops_events_after_terminal() {
        let out = collect(vec![
            StreamEvent::error("boom"),
            StreamEvent::TextDelta { delta: "late".into() },
            StreamEvent::Done,
        ])
        .await;
        assert_eq!(out, vec![StreamEvent::error("boom")]);
    }
}
