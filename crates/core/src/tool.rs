//! Tool types for both sides of the tool gateway contract.
//!
//! The gateway side implements [`Tool`] and registers it in a
//! [`ToolRegistry`]; the orchestrator side only ever sees
//! [`ToolDefinition`]s (offered to the model) and [`CallToolResult`]s
//! (coming back from a [`crate::ToolSession`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::ToolError;

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    #[serde(alias = "inputSchema")]
    pub parameters: Value,
}

/// Hint that a tool result should be rendered with a UI resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiHint {
    #[serde(rename = "resourceId")]
    pub resource_id: String,
}

/// What a [`Tool`] hands back to the gateway.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Human-readable summary text
    pub summary: String,

    /// Tool-specific structured data (`null` when nothing was found)
    pub data: Value,

    /// Optional UI resource to render `data` with
    pub ui: Option<UiHint>,

    /// Domain-level failure (e.g. unknown identifier), not a transport fault
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(summary: impl Into<String>, data: Value) -> Self {
        Self {
            summary: summary.into(),
            data,
            ui: None,
            is_error: false,
        }
    }

    /// A "not found" style result: `data` is null and `is_error` is set.
    pub fn not_found(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            data: Value::Null,
            ui: None,
            is_error: true,
        }
    }

    pub fn with_ui(mut self, resource_id: impl Into<String>) -> Self {
        self.ui = Some(UiHint {
            resource_id: resource_id.into(),
        });
        self
    }
}

/// A single content item of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    #[serde(other)]
    Unsupported,
}

/// The wire shape of a tool call result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentItem>,

    /// `{data, ui?}` for the tools in this system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl CallToolResult {
    /// An `isError` result with `data: null` and a single text item.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text { text: text.into() }],
            structured_content: Some(serde_json::json!({ "data": null })),
            is_error: true,
        }
    }

    /// Joined text of all text content items.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|item| match item {
                ContentItem::Text { text } => Some(text.as_str()),
                ContentItem::Unsupported => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The `data` member of the structured content, if any.
    pub fn data(&self) -> Option<&Value> {
        self.structured_content.as_ref().and_then(|s| s.get("data"))
    }

    /// The UI hint carried by the structured content, if any.
    pub fn ui_hint(&self) -> Option<UiHint> {
        let ui = self.structured_content.as_ref()?.get("ui")?;
        serde_json::from_value(ui.clone()).ok()
    }
}

impl From<ToolOutput> for CallToolResult {
    fn from(output: ToolOutput) -> Self {
        let mut structured = serde_json::json!({ "data": output.data });
        if let Some(ui) = output.ui {
            structured["ui"] = serde_json::json!(ui);
        }
        Self {
            content: vec![ContentItem::Text {
                text: output.summary,
            }],
            structured_content: Some(structured),
            is_error: output.is_error,
        }
    }
}

/// A listed resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub mime_type: String,
}

/// One content entry of a resource read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A schema-described backend operation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g. "get_orders").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with already-parsed JSON arguments.
    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool definitions, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(arguments).await
    }

    /// Execute a tool and fold every failure into an `isError` result.
    pub async fn call(&self, name: &str, arguments: Value) -> CallToolResult {
        match self.execute(name, arguments).await {
            Ok(output) => output.into(),
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
