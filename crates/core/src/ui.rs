//! UI blocks and UI resource definitions.
//!
//! Responses are a sequence of typed blocks instead of free-form markup.
//! A `ui_resource` block names a [`UiResourceDefinition`] that the client
//! fetches separately and renders the block's data against.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One renderable unit of a response. Order is rendering order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiBlock {
    Text {
        content: String,
    },
    UiResource {
        #[serde(rename = "resourceId")]
        resource_id: String,
        data: Value,
    },
    Actions {
        actions: Vec<ActionItem>,
    },
}

impl UiBlock {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }
}

/// A clickable action offered to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub label: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<ActionParams>,
}

/// Action parameters: either concrete values or the names of row keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionParams {
    Values(Map<String, Value>),
    Keys(Vec<String>),
}

/// The non-streaming response shape: `{type: "message", blocks: [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "message")]
pub struct AgentResponse {
    pub blocks: Vec<UiBlock>,
}

/// A column of a table layout (also used by detail sections).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// A per-row action of a table layout; `params` names row keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableAction {
    pub label: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailField {
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// A nested table inside a detail layout, fed from `data[data_key]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSection {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub columns: Vec<TableColumn>,
    pub data_key: String,
}

/// A named, immutable layout schema the client renders data against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiResourceDefinition {
    Table {
        id: String,
        title: String,
        columns: Vec<TableColumn>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        actions: Option<Vec<TableAction>>,
    },
    Detail {
        id: String,
        title: String,
        fields: Vec<DetailField>,
        sections: Vec<DetailSection>,
    },
}

impl UiResourceDefinition {
    pub fn id(&self) -> &str {
        match self {
            Self::Table { id, .. } | Self::Detail { id, .. } => id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Table { title, .. } | Self::Detail { title, .. } => title,
        }
    }
}
