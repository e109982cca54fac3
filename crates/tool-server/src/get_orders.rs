//! `get_orders`: order summaries for the current user.

use std::sync::Arc;

use async_trait::async_trait;
use orderchat_core::error::ToolError;
use orderchat_core::tool::{Tool, ToolOutput};
use serde::Deserialize;

use crate::orders::OrderStore;
use crate::resources::ORDER_TABLE;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct GetOrdersArgs {
    #[serde(default)]
    user_id: Option<String>,
}

pub struct GetOrdersTool {
    store: Arc<OrderStore>,
}

impl GetOrdersTool {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetOrdersTool {
    fn name(&self) -> &str {
        "get_orders"
    }

    fn description(&self) -> &str {
        "Return order summaries for the current user"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "userId": {
                    "type": "string",
                    "description": "The user whose orders to list (optional)"
                }
            },
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        // Models sometimes send `null` for a no-argument call.
        let args: GetOrdersArgs = if arguments.is_null() {
            GetOrdersArgs::default()
        } else {
            serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?
        };

        let orders = self.store.summaries();
        let user = args
            .user_id
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or("unknown");
        let summary = format!("Found {} orders for user {user}.", orders.len());

        Ok(ToolOutput::ok(summary, serde_json::json!({ "orders": orders })).with_ui(ORDER_TABLE))
    }
}
