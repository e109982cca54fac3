//! The tool session contract: how the orchestrator reaches the tool gateway.
//!
//! A [`SessionConnector`] knows how to establish one session (spawn a
//! process, wire up an in-process server, ...). A [`ToolSession`] is the
//! established connection. Neither is expected to retry; failures surface
//! as [`SessionError`]s.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SessionError;
use crate::tool::{CallToolResult, ResourceContents, ResourceDescriptor, ToolDefinition};

/// An established session with the tool gateway.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Invoke a tool by name with untyped arguments.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, SessionError>;

    /// Read a resource by URI.
    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, SessionError>;

    /// List the tools the gateway exposes.
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, SessionError> {
        Ok(Vec::new())
    }

    /// List the resources the gateway publishes.
    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, SessionError> {
        Ok(Vec::new())
    }

    /// Tear the session down. Must be safe to call more than once.
    async fn close(&self) -> Result<(), SessionError>;
}

/// Establishes tool sessions.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Short label used in logs (e.g. "stdio", "in_process").
    fn label(&self) -> &str;

    async fn connect(&self) -> Result<Box<dyn ToolSession>, SessionError>;
}
