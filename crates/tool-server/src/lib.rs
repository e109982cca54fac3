//! The order tool server.
//!
//! Exposes two order tools and two UI resource layouts over newline-delimited
//! JSON-RPC 2.0. Run it as a child process (`orderchat tool-server`, speaking
//! on stdio) or in-process over an in-memory pipe.

pub mod get_order_detail;
pub mod get_orders;
pub mod jsonrpc;
pub mod orders;
pub mod resources;
pub mod server;

use std::sync::Arc;

use orderchat_core::tool::ToolRegistry;

pub use orders::{Order, OrderItem, OrderStore, OrderSummary};
pub use resources::UiResourceCatalog;
pub use server::ToolServer;

/// A registry with both order tools over the sample dataset.
pub fn default_registry() -> ToolRegistry {
    registry_for(Arc::new(OrderStore::sample()))
}

/// A registry with both order tools over `store`.
pub fn registry_for(store: Arc<OrderStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(get_orders::GetOrdersTool::new(store.clone())));
    registry.register(Box::new(get_order_detail::GetOrderDetailTool::new(store)));
    registry
}

/// Serve on the process's stdin and stdout until stdin closes.
///
/// Stdout carries protocol traffic only; log to stderr.
pub async fn serve_stdio() -> std::io::Result<()> {
    let server = ToolServer::builtin()?;
    server.serve(tokio::io::stdin(), tokio::io::stdout()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_order_tools() {
        let registry = default_registry();
        assert_eq!(registry.names(), vec!["get_order_detail", "get_orders"]);
    }
}
