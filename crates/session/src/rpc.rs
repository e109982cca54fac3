//! A [`ToolSession`] over any newline-delimited JSON-RPC byte pipe.
//!
//! Requests are written under a lock, one line each. A background reader
//! task routes responses back to their callers by id. When the pipe closes,
//! every outstanding request fails with a connection error.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use orderchat_core::error::SessionError;
use orderchat_core::session::ToolSession;
use orderchat_core::tool::{CallToolResult, ResourceContents, ResourceDescriptor, ToolDefinition};
use orderchat_tool_server::jsonrpc::{PROTOCOL_VERSION, RpcRequest, RpcResponse};

type Reply = Result<Value, SessionError>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// What must be torn down alongside the pipe.
pub enum Peer {
    /// A spawned tool server process.
    Process(Child),
    /// A tool server task running in this process.
    Task(JoinHandle<()>),
}

pub struct RpcSession {
    writer: Mutex<Option<Writer>>,
    pending: Pending,
    next_id: AtomicU64,
    closed: AtomicBool,
    disconnected: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
    peer: Mutex<Option<Peer>>,
}

#[derive(Deserialize)]
struct ListToolsResult {
    #[serde(default)]
    tools: Vec<ToolDefinition>,
}

#[derive(Deserialize)]
struct ListResourcesResult {
    #[serde(default)]
    resources: Vec<ResourceDescriptor>,
}

#[derive(Deserialize)]
struct ReadResourceResult {
    #[serde(default)]
    contents: Vec<ResourceContents>,
}

impl RpcSession {
    /// Start the reader task over `reader`. No handshake is performed.
    pub fn start<R>(reader: R, writer: Writer, peer: Peer) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let disconnected = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_loop(reader, pending.clone(), disconnected.clone()));

        Self {
            writer: Mutex::new(Some(writer)),
            pending,
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            disconnected,
            reader: Mutex::new(Some(reader)),
            peer: Mutex::new(Some(peer)),
        }
    }

    /// The MCP `initialize` handshake followed by `notifications/initialized`.
    pub async fn initialize(&self) -> Result<Value, SessionError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "orderchat",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await?;
        self.notify("notifications/initialized").await?;
        debug!(server = %result["serverInfo"]["name"], "Tool session initialized");
        Ok(result)
    }

    async fn request(&self, method: &str, params: Value) -> Reply {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        // The reader may have drained `pending` before our insert landed.
        if self.disconnected.load(Ordering::SeqCst) {
            self.pending.lock().await.remove(&id);
            return Err(connection_lost());
        }

        let request = RpcRequest::new(id, method, params);
        if let Err(e) = self.write(&request).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        debug!(id, method, "Request sent");
        rx.await.unwrap_or(Err(SessionError::Closed))
    }

    async fn notify(&self, method: &str) -> Result<(), SessionError> {
        self.write(&RpcRequest::notification(method)).await
    }

    async fn write(&self, request: &RpcRequest) -> Result<(), SessionError> {
        let line =
            serde_json::to_string(request).map_err(|e| SessionError::Protocol(e.to_string()))?;

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(SessionError::Closed)?;
        let io = |e: std::io::Error| SessionError::Connection(e.to_string());
        writer.write_all(line.as_bytes()).await.map_err(io)?;
        writer.write_all(b"\n").await.map_err(io)?;
        writer.flush().await.map_err(io)
    }

    async fn fail_pending(&self, error: SessionError) {
        for (_, tx) in self.pending.lock().await.drain() {
            let _ = tx.send(Err(error.clone()));
        }
    }
}

fn connection_lost() -> SessionError {
    SessionError::Connection("tool server closed the connection".into())
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, SessionError> {
    serde_json::from_value(value).map_err(|e| SessionError::Protocol(e.to_string()))
}

async fn read_loop<R>(reader: R, pending: Pending, disconnected: Arc<AtomicBool>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Tool server read failed");
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response: RpcResponse = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed line from tool server");
                continue;
            }
        };

        let Some(id) = response.id.as_u64() else {
            debug!("Ignoring message without a request id");
            continue;
        };

        let Some(tx) = pending.lock().await.remove(&id) else {
            warn!(id, "Response for unknown request id");
            continue;
        };

        let reply = match (response.error, response.result) {
            (Some(err), _) => Err(SessionError::Rpc {
                code: err.code,
                message: err.message,
            }),
            (None, result) => Ok(result.unwrap_or(Value::Null)),
        };
        let _ = tx.send(reply);
    }

    disconnected.store(true, Ordering::SeqCst);
    for (_, tx) in pending.lock().await.drain() {
        let _ = tx.send(Err(connection_lost()));
    }
}

#[async_trait]
impl ToolSession for RpcSession {
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, SessionError> {
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        decode(result)
    }

    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, SessionError> {
        let result = self.request("resources/read", json!({ "uri": uri })).await?;
        Ok(decode::<ReadResourceResult>(result)?.contents)
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, SessionError> {
        let result = self.request("tools/list", json!({})).await?;
        Ok(decode::<ListToolsResult>(result)?.tools)
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, SessionError> {
        let result = self.request("resources/list", json!({})).await?;
        Ok(decode::<ListResourcesResult>(result)?.resources)
    }

    async fn close(&self) -> Result<(), SessionError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Dropping the writer closes the server's stdin.
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
        self.fail_pending(SessionError::Closed).await;

        match self.peer.lock().await.take() {
            Some(Peer::Process(mut child)) => {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "Tool server process already gone");
                }
            }
            Some(Peer::Task(handle)) => handle.abort(),
            None => {}
        }

        debug!("Tool session closed");
        Ok(())
    }
}
