//! `get_order_detail`: one order with its line items.

use std::sync::Arc;

use async_trait::async_trait;
use orderchat_core::error::ToolError;
use orderchat_core::tool::{Tool, ToolOutput};
use serde::Deserialize;

use crate::orders::OrderStore;
use crate::resources::ORDER_DETAIL;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct GetOrderDetailArgs {
    order_id: String,
}

pub struct GetOrderDetailTool {
    store: Arc<OrderStore>,
}

impl GetOrderDetailTool {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetOrderDetailTool {
    fn name(&self) -> &str {
        "get_order_detail"
    }

    fn description(&self) -> &str {
        "Return detail for a specific order"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "orderId": {
                    "type": "string",
                    "description": "The order identifier, e.g. A001"
                }
            },
            "required": ["orderId"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: GetOrderDetailArgs =
            serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;

        let Some(order) = self.store.find(&args.order_id) else {
            return Ok(ToolOutput::not_found(format!(
                "Order {} not found.",
                args.order_id
            )));
        };

        let data = serde_json::to_value(order).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })?;

        Ok(
            ToolOutput::ok(format!("Order {} loaded.", args.order_id), data)
                .with_ui(ORDER_DETAIL),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> GetOrderDetailTool {
        GetOrderDetailTool::new(Arc::new(OrderStore::sample()))
    }

    #[tokio::test]
    async fn known_order_has_items_and_detail_hint() {
        let output = tool()
            .execute(serde_json::json!({"orderId": "A001"}))
            .await
            .unwrap();

        assert!(!output.is_error);
        assert_eq!(output.summary, "Order A001 loaded.");
        assert_eq!(output.data["status"], "paid");
        assert_eq!(output.data["items"][1]["name"], "Banana");
        assert_eq!(output.ui.unwrap().resource_id, "order_detail");
    }

    #[tokio::test]
    async fn unknown_order_is_domain_error() {
        let output = tool()
            .execute(serde_json::json!({"orderId": "Z9"}))
            .await
            .unwrap();

        assert!(output.is_error);
        assert_eq!(output.summary, "Order Z9 not found.");
        assert!(output.data.is_null());
        assert!(output.ui.is_none());
    }

    #[tokio::test]
    async fn missing_order_id_is_rejected() {
        let err = tool().execute(serde_json::json!({})).await.unwrap_err();
        match err {
            ToolError::InvalidArguments { tool_name, reason } => {
                assert_eq!(tool_name, "get_order_detail");
                assert!(reason.contains("orderId"));
            }
            other => panic!("expected InvalidArguments, got {other:?}"),
        }
    }
}
