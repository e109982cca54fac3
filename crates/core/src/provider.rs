//! The `ChatModel` trait: the abstraction over language model backends.
//!
//! The orchestrator only ever needs two things from a model: a single
//! completion with tools bound (which may come back as tool calls), and a
//! streamed completion of plain text. Any provider that can do both can be
//! dropped in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::ToolDefinition;

/// Configuration for a single model request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The conversation messages
    pub messages: Vec<Message>,

    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tools the model may call. Empty means no tools are bound.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// A complete (non-streaming) response from a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message; `tool_calls` is non-empty when the model
    /// chose to call tools.
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Incremental text fragments of a streamed completion, in arrival order.
pub type FragmentStream = mpsc::Receiver<Result<String, ProviderError>>;

/// The language model capability the orchestrator is written against.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// A human-readable name for this model backend (e.g. "deepseek").
    fn name(&self) -> &str;

    /// Invoke the model once. Tools in `request.tools` are offered to it.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Invoke the model in streaming mode, yielding text fragments.
    ///
    /// Implementations must not bind tools here. The default calls
    /// `complete()` without tools and emits its content as one fragment.
    async fn stream_complete(
        &self,
        request: ProviderRequest,
    ) -> Result<FragmentStream, ProviderError> {
        let response = self
            .complete(ProviderRequest {
                tools: Vec::new(),
                ..request
            })
            .await?;
        let (tx, rx) = mpsc::channel(1);
        if !response.message.content.is_empty() {
            let _ = tx.send(Ok(response.message.content)).await;
        }
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            let content = format!("{last} (tools: {})", request.tools.len());
            Ok(ProviderResponse {
                message: Message::assistant(content),
                usage: None,
                model: "echo".into(),
            })
        }
    }

    #[tokio::test]
    async fn default_stream_wraps_complete_without_tools() {
        let request = ProviderRequest {
            messages: vec![Message::user("hello")],
            temperature: 0.0,
            max_tokens: None,
            tools: vec![ToolDefinition {
                name: "get_orders".into(),
                description: "list orders".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
        };

        let mut rx = EchoModel.stream_complete(request).await.unwrap();
        let fragment = rx.recv().await.unwrap().unwrap();
        assert_eq!(fragment, "hello (tools: 0)");
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn request_skips_empty_tools() {
        let request = ProviderRequest {
            messages: vec![],
            temperature: 0.0,
            max_tokens: None,
            tools: vec![],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("tools"));
    }
}
