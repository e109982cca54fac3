//! Scripted collaborators for orchestrator tests.
//!
//! Available to this crate's tests and, through the `testing` feature, to
//! downstream crates' tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use orderchat_core::error::{ProviderError, SessionError};
use orderchat_core::message::{Message, MessageToolCall};
use orderchat_core::provider::{ChatModel, FragmentStream, ProviderRequest, ProviderResponse, Usage};
use orderchat_core::session::{SessionConnector, ToolSession};
use orderchat_core::tool::{CallToolResult, ResourceContents, ResourceDescriptor, ToolDefinition};

/// What the first (tool-bound) model call does.
enum First {
    Respond(ProviderResponse),
    Fail(ProviderError),
    Panic,
}

/// A model that follows a fixed script and records every request.
///
/// The first `complete` call answers per the script. `stream_complete`
/// yields the scripted fragments, then the scripted stream error if any.
pub struct ScriptedModel {
    first: First,
    fragments: Vec<String>,
    stream_error: Option<ProviderError>,
    fail_stream_start: Option<ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
    stream_requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedModel {
    fn with_first(first: First) -> Self {
        Self {
            first,
            fragments: Vec::new(),
            stream_error: None,
            fail_stream_start: None,
            requests: Mutex::new(Vec::new()),
            stream_requests: Mutex::new(Vec::new()),
        }
    }

    /// The model answers directly, without tool calls.
    pub fn direct() -> Self {
        Self::with_first(First::Respond(make_response(Vec::new())))
    }

    /// The model requests these tool calls, in order.
    pub fn calling(calls: Vec<MessageToolCall>) -> Self {
        Self::with_first(First::Respond(make_response(calls)))
    }

    /// The tool-bound call fails.
    pub fn failing(error: ProviderError) -> Self {
        Self::with_first(First::Fail(error))
    }

    /// The tool-bound call panics.
    pub fn panicking() -> Self {
        Self::with_first(First::Panic)
    }

    /// Fragments yielded by the summary stream.
    pub fn streaming(mut self, fragments: &[&str]) -> Self {
        self.fragments = fragments.iter().map(|s| s.to_string()).collect();
        self
    }

    /// The summary stream breaks after its fragments.
    pub fn stream_breaks(mut self, error: ProviderError) -> Self {
        self.stream_error = Some(error);
        self
    }

    /// The summary stream cannot be opened.
    pub fn stream_refused(mut self, error: ProviderError) -> Self {
        self.fail_stream_start = Some(error);
        self
    }

    /// Requests seen by `complete`, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests seen by `stream_complete`, in order.
    pub fn stream_requests(&self) -> Vec<ProviderRequest> {
        self.stream_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        match &self.first {
            First::Respond(response) => Ok(response.clone()),
            First::Fail(error) => Err(error.clone()),
            First::Panic => panic!("scripted model panicked"),
        }
    }

    async fn stream_complete(
        &self,
        request: ProviderRequest,
    ) -> Result<FragmentStream, ProviderError> {
        self.stream_requests.lock().unwrap().push(request);
        if let Some(error) = &self.fail_stream_start {
            return Err(error.clone());
        }

        let (tx, rx) = mpsc::channel(self.fragments.len() + 1);
        for fragment in &self.fragments {
            let _ = tx.try_send(Ok(fragment.clone()));
        }
        if let Some(error) = &self.stream_error {
            let _ = tx.try_send(Err(error.clone()));
        }
        Ok(rx)
    }
}

fn make_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut message = Message::assistant("");
    message.tool_calls = tool_calls;
    ProviderResponse {
        message,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "scripted-model".into(),
    }
}

/// Helper to create a tool call with a stable id.
pub fn make_tool_call(id: &str, name: &str, args: Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: args.to_string(),
    }
}

/// Wraps a connector and counts connects and session closes.
pub struct CountingConnector {
    inner: Arc<dyn SessionConnector>,
    connects: AtomicUsize,
    closes: Arc<AtomicUsize>,
    fail_connect: bool,
    fail_calls: bool,
}

impl CountingConnector {
    pub fn new(inner: Arc<dyn SessionConnector>) -> Self {
        Self {
            inner,
            connects: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            fail_connect: false,
            fail_calls: false,
        }
    }

    /// Every connection attempt fails.
    pub fn refusing(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Sessions connect, but every tool call fails at the transport level.
    pub fn with_failing_calls(mut self) -> Self {
        self.fail_calls = true;
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionConnector for CountingConnector {
    fn label(&self) -> &str {
        "counting"
    }

    async fn connect(&self) -> Result<Box<dyn ToolSession>, SessionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(SessionError::Spawn {
                command: "orders-tool-server".into(),
                reason: "connection refused".into(),
            });
        }
        Ok(Box::new(CountingSession {
            inner: self.inner.connect().await?,
            closes: self.closes.clone(),
            fail_calls: self.fail_calls,
        }))
    }
}

struct CountingSession {
    inner: Box<dyn ToolSession>,
    closes: Arc<AtomicUsize>,
    fail_calls: bool,
}

#[async_trait]
impl ToolSession for CountingSession {
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, SessionError> {
        if self.fail_calls {
            return Err(SessionError::Connection("tool server went away".into()));
        }
        self.inner.call_tool(name, arguments).await
    }

    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, SessionError> {
        self.inner.read_resource(uri).await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, SessionError> {
        self.inner.list_tools().await
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, SessionError> {
        self.inner.list_resources().await
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}
