//! The turn orchestrator.
//!
//! One turn runs as:
//!
//! 1. **Context**: system instruction + the user's text
//! 2. **Decide**: one model call with the tool definitions bound
//! 3. **Act**: run each requested tool call in order through a fresh
//!    [`ToolSessionClient`], emitting a `ui_resource` block for every result
//!    that carries a UI hint, and answering each call with a tool message
//! 4. **Summarize**: stream a plain-prose summary with no tools bound,
//!    emitting each fragment as a `text_delta`, then the trimmed full text
//!    as a `text` block
//! 5. **Finish**: `done`, or a single `error` on any failure
//!
//! The session client is closed exactly once per turn, on every exit path,
//! including a panic inside the turn or the consumer going away.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use orderchat_core::error::{Error, ProviderError, SessionError};
use orderchat_core::message::{Conversation, Message, MessageToolCall};
use orderchat_core::provider::{ChatModel, ProviderRequest};
use orderchat_core::session::SessionConnector;
use orderchat_core::tool::{CallToolResult, ToolDefinition};
use orderchat_core::ui::{AgentResponse, UiBlock};
use orderchat_session::ToolSessionClient;

use crate::response::collect_response;
use crate::stream_event::StreamEvent;

/// Instruction that opens every turn.
pub const SYSTEM_PROMPT: &str = "You are an order assistant.

You can call tools to fetch real order data.

You must:
- call a tool whenever the answer depends on order data
- rely on the UI resources the tools return to present that data

You must not:
- return HTML
- describe the UI yourself
- invent UI types that do not exist";

/// Instruction appended before the summary is streamed.
pub const SUMMARY_INSTRUCTION: &str = "Based on the available tool results, briefly describe \
the current status in the user's language. Reply with plain prose only; do not use HTML or \
Markdown formatting.";

/// Deterministic sampling for both model calls.
const TEMPERATURE: f32 = 0.0;

const EVENT_BUFFER: usize = 64;

/// Drives turns against a chat model and the tool gateway.
///
/// Cheap to share: each turn gets its own conversation and its own
/// session client.
pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    tools: Vec<ToolDefinition>,
    connector: Arc<dyn SessionConnector>,
    max_tokens: Option<u32>,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Vec<ToolDefinition>,
        connector: Arc<dyn SessionConnector>,
    ) -> Self {
        Self {
            model,
            tools,
            connector,
            max_tokens: None,
        }
    }

    /// Set the max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Start a turn. Events arrive on the returned receiver, ending with
    /// exactly one terminal event.
    ///
    /// Dropping the receiver abandons the turn; its session is still closed.
    pub fn run_stream(&self, user_text: impl Into<String>) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let turn = Turn {
            model: self.model.clone(),
            tools: self.tools.clone(),
            max_tokens: self.max_tokens,
            client: ToolSessionClient::new(self.connector.clone()),
            tx,
        };
        tokio::spawn(turn.run(user_text.into()));
        rx
    }

    /// Run a turn to completion and collect its blocks.
    ///
    /// A turn that ends in `error` is returned as [`Error::Turn`].
    pub async fn run(&self, user_text: impl Into<String>) -> Result<AgentResponse, Error> {
        collect_response(self.run_stream(user_text)).await
    }
}

/// Why a turn stopped early.
enum Halt {
    Failed(Error),
    /// The consumer dropped the receiver.
    Disconnected,
}

impl From<Error> for Halt {
    fn from(e: Error) -> Self {
        Self::Failed(e)
    }
}

impl From<ProviderError> for Halt {
    fn from(e: ProviderError) -> Self {
        Self::Failed(e.into())
    }
}

impl From<SessionError> for Halt {
    fn from(e: SessionError) -> Self {
        Self::Failed(e.into())
    }
}

struct Turn {
    model: Arc<dyn ChatModel>,
    tools: Vec<ToolDefinition>,
    max_tokens: Option<u32>,
    client: ToolSessionClient,
    tx: mpsc::Sender<StreamEvent>,
}

impl Turn {
    async fn run(self, user_text: String) {
        let outcome = AssertUnwindSafe(self.drive(user_text)).catch_unwind().await;

        let terminal = match outcome {
            Ok(Ok(())) => Some(StreamEvent::Done),
            Ok(Err(Halt::Failed(e))) => {
                warn!(error = %e, "Turn failed");
                Some(StreamEvent::error(e.to_string()))
            }
            Ok(Err(Halt::Disconnected)) => {
                debug!("Turn consumer went away");
                None
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(%message, "Turn panicked");
                Some(StreamEvent::error(message))
            }
        };

        // Close before the terminal event so a consumer that has seen it
        // can rely on the session being gone.
        if let Err(e) = self.client.close().await {
            warn!(error = %e, "Failed to close tool session");
        }

        if let Some(event) = terminal {
            let _ = self.tx.send(event).await;
        }
    }

    async fn drive(&self, user_text: String) -> Result<(), Halt> {
        let mut conversation = Conversation::for_turn(SYSTEM_PROMPT, user_text);

        let response = self
            .model
            .complete(self.request(&conversation, self.tools.clone()))
            .await?;
        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Planning call finished"
            );
        }

        let calls = response.message.tool_calls.clone();
        conversation.push(response.message);

        if !calls.is_empty() {
            info!(count = calls.len(), "Executing tool calls");
            for call in &calls {
                self.execute(&mut conversation, call).await?;
            }
        }

        let unanswered = conversation.unanswered_tool_calls().len();
        if unanswered > 0 {
            return Err(Error::Internal(format!("{unanswered} tool calls left unanswered")).into());
        }

        conversation.push(Message::system(SUMMARY_INSTRUCTION));

        let mut fragments = self
            .model
            .stream_complete(self.request(&conversation, Vec::new()))
            .await?;

        let mut text = String::new();
        while let Some(fragment) = fragments.recv().await {
            let fragment = fragment?;
            if fragment.is_empty() {
                continue;
            }
            text.push_str(&fragment);
            self.emit(StreamEvent::TextDelta { delta: fragment }).await?;
        }

        let text = text.trim();
        if !text.is_empty() {
            self.emit(StreamEvent::Block {
                block: UiBlock::text(text),
            })
            .await?;
        }

        Ok(())
    }

    /// Run one tool call and answer it with a tool message.
    async fn execute(
        &self,
        conversation: &mut Conversation,
        call: &MessageToolCall,
    ) -> Result<(), Halt> {
        let result = match parse_arguments(&call.arguments) {
            Ok(arguments) => self.client.call_tool(&call.name, arguments).await?,
            Err(reason) => {
                CallToolResult::error(format!("Invalid arguments for {}: {reason}", call.name))
            }
        };

        debug!(tool = %call.name, is_error = result.is_error, "Tool call finished");

        if let Some(hint) = result.ui_hint() {
            let data = result.data().cloned().unwrap_or(Value::Null);
            self.emit(StreamEvent::Block {
                block: UiBlock::UiResource {
                    resource_id: hint.resource_id,
                    data,
                },
            })
            .await?;
        }

        conversation.push(Message::tool_result(
            &call.id,
            &call.name,
            tool_message_payload(&call.name, &result),
        ));
        Ok(())
    }

    fn request(&self, conversation: &Conversation, tools: Vec<ToolDefinition>) -> ProviderRequest {
        ProviderRequest {
            messages: conversation.messages().to_vec(),
            temperature: TEMPERATURE,
            max_tokens: self.max_tokens,
            tools,
        }
    }

    async fn emit(&self, event: StreamEvent) -> Result<(), Halt> {
        self.tx.send(event).await.map_err(|_| Halt::Disconnected)
    }
}

/// Model-produced arguments: empty means no arguments.
fn parse_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw).map_err(|e| e.to_string())
}

/// The text of a tool message: `{"tool", "result"}`, plus the error text
/// when the gateway flagged the result as an error.
pub fn tool_message_payload(tool: &str, result: &CallToolResult) -> String {
    let body = match &result.structured_content {
        Some(structured) => structured.clone(),
        None => serde_json::to_value(result).unwrap_or(Value::Null),
    };
    let mut payload = json!({ "tool": tool, "result": body });
    if result.is_error {
        payload["isError"] = Value::Bool(true);
        payload["message"] = Value::String(result.text());
    }
    payload.to_string()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("Turn failed unexpectedly: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("Turn failed unexpectedly: {s}")
    } else {
        "Turn failed unexpectedly".into()
    }
}
