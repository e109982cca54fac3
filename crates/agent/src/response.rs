//! Folding a turn's event stream into a single response.

use tokio::sync::mpsc;

use orderchat_core::error::Error;
use orderchat_core::ui::{AgentResponse, UiBlock};

use crate::stream_event::StreamEvent;

/// Drain a turn's events into an [`AgentResponse`].
///
/// Blocks keep their emission order. When deltas were streamed but no
/// `text` block arrived, the trimmed concatenation is put first. An `error`
/// event becomes [`Error::Turn`] carrying its message.
pub async fn collect_response(
    mut events: mpsc::Receiver<StreamEvent>,
) -> Result<AgentResponse, Error> {
    let mut text = String::new();
    let mut blocks = Vec::new();

    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::TextDelta { delta } => text.push_str(&delta),
            StreamEvent::Block { block } => blocks.push(block),
            StreamEvent::Error { message } => return Err(Error::Turn { message }),
            StreamEvent::Done => {
                let text = text.trim();
                if !text.is_empty() && !blocks.iter().any(UiBlock::is_text) {
                    blocks.insert(0, UiBlock::text(text));
                }
                return Ok(AgentResponse { blocks });
            }
        }
    }

    Err(Error::Internal(
        "turn ended without a terminal event".into(),
    ))
}
