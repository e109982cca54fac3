//! The JSON-RPC request loop.
//!
//! Reads one request per line, answers one response per line, in order.
//! Stateless across requests: the registry and the resource catalog are
//! both immutable once the server is built.

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use orderchat_core::tool::ToolRegistry;

use crate::jsonrpc::{
    INTERNAL_ERROR, INVALID_REQUEST, JSONRPC_VERSION, PARSE_ERROR, PROTOCOL_VERSION, RpcError,
    RpcRequest, RpcResponse,
};
use crate::resources::UiResourceCatalog;

pub const SERVER_NAME: &str = "orders-tool-server";

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

pub struct ToolServer {
    registry: ToolRegistry,
    resources: UiResourceCatalog,
}

impl ToolServer {
    pub fn new(registry: ToolRegistry, resources: UiResourceCatalog) -> Self {
        Self {
            registry,
            resources,
        }
    }

    /// The order tools over the sample dataset plus the built-in layouts.
    pub fn builtin() -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            crate::default_registry(),
            UiResourceCatalog::builtin()?,
        ))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Serve requests from `reader` until it reaches end of input.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            tools = ?self.registry.names(),
            resources = ?self.resources.ids(),
            "Tool server ready"
        );

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            let encoded = serde_json::to_string(&response)?;
            writer.write_all(encoded.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        info!("Tool server input closed");
        Ok(())
    }

    /// Handle one raw line. Notifications produce no response.
    pub async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Unparseable JSON-RPC line");
                return Some(RpcResponse::failure(
                    Value::Null,
                    RpcError::new(PARSE_ERROR, format!("Parse error: {e}")),
                ));
            }
        };

        let request: RpcRequest = match serde_json::from_value(value.clone()) {
            Ok(r) => r,
            Err(e) => {
                let id = value.get("id").cloned().unwrap_or(Value::Null);
                return Some(RpcResponse::failure(
                    id,
                    RpcError::new(INVALID_REQUEST, format!("Invalid request: {e}")),
                ));
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            let id = request.id.unwrap_or(Value::Null);
            return Some(RpcResponse::failure(
                id,
                RpcError::new(INVALID_REQUEST, "Invalid request: jsonrpc must be \"2.0\""),
            ));
        }

        let outcome = self.dispatch(&request.method, request.params).await;

        let Some(id) = request.id else {
            debug!(method = %request.method, "Notification handled");
            return None;
        };

        Some(match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::failure(id, error),
        })
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        debug!(method, "Dispatching request");
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {}, "resources": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                }
            })),
            "notifications/initialized" | "ping" => Ok(json!({})),
            "tools/list" => {
                let tools: Vec<Value> = self
                    .registry
                    .definitions()
                    .into_iter()
                    .map(|d| {
                        json!({
                            "name": d.name,
                            "description": d.description,
                            "inputSchema": d.parameters,
                        })
                    })
                    .collect();
                Ok(json!({ "tools": tools }))
            }
            "tools/call" => {
                let params: CallToolParams =
                    serde_json::from_value(params).map_err(RpcError::invalid_params)?;
                let result = self.registry.call(&params.name, params.arguments).await;
                if result.is_error {
                    info!(tool = %params.name, text = %result.text(), "Tool returned error result");
                } else {
                    debug!(tool = %params.name, "Tool call succeeded");
                }
                serde_json::to_value(result).map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))
            }
            "resources/list" => Ok(json!({ "resources": self.resources.list() })),
            "resources/read" => {
                let params: ReadResourceParams =
                    serde_json::from_value(params).map_err(RpcError::invalid_params)?;
                let contents = self
                    .resources
                    .read(&params.uri)
                    .ok_or_else(|| RpcError::resource_not_found(&params.uri))?;
                Ok(json!({ "contents": [contents] }))
            }
            other => Err(RpcError::method_not_found(other)),
        }
    }
}
