//! # orderchat core
//!
//! Domain types, traits, and error definitions shared by every orderchat
//! crate. Nothing here talks to the network or spawns processes; the
//! concrete model, tool session, and transport implementations live in
//! their own crates and depend inward on this one.
//!
//! ## Seams
//!
//! - [`ChatModel`]: the language model capability the orchestrator drives
//! - [`ToolSession`] / [`SessionConnector`]: the tool gateway contract
//! - [`Tool`]: a server-side, schema-described order operation

pub mod error;
pub mod message;
pub mod provider;
pub mod session;
pub mod tool;
pub mod ui;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, SessionError, ToolError};
pub use message::{Conversation, Message, MessageToolCall, Role};
pub use provider::{ChatModel, FragmentStream, ProviderRequest, ProviderResponse, Usage};
pub use session::{SessionConnector, ToolSession};
pub use tool::{
    CallToolResult, ContentItem, ResourceContents, ResourceDescriptor, Tool, ToolDefinition,
    ToolOutput, ToolRegistry, UiHint,
};
pub use ui::{
    ActionItem, ActionParams, AgentResponse, DetailField, DetailSection, TableAction,
    TableColumn, UiBlock, UiResourceDefinition,
};

/// URI scheme under which UI resources are published by the tool gateway.
pub const UI_RESOURCE_URI_SCHEME: &str = "ui-resource://";

/// Build the resource URI for a UI resource id.
pub fn ui_resource_uri(resource_id: &str) -> String {
    format!("{UI_RESOURCE_URI_SCHEME}{resource_id}")
}

/// Extract the resource id from a `ui-resource://` URI.
pub fn ui_resource_id(uri: &str) -> Option<&str> {
    uri.strip_prefix(UI_RESOURCE_URI_SCHEME)
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_uri_roundtrip() {
        let uri = ui_resource_uri("order_table");
        assert_eq!(uri, "ui-resource://order_table");
        assert_eq!(ui_resource_id(&uri), Some("order_table"));
    }

    #[test]
    fn resource_id_rejects_foreign_scheme() {
        assert_eq!(ui_resource_id("file:///etc/passwd"), None);
        assert_eq!(ui_resource_id("ui-resource://"), None);
    }
}
