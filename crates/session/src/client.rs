//! The lazily-connected tool session client.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use orderchat_core::error::SessionError;
use orderchat_core::session::{SessionConnector, ToolSession};
use orderchat_core::tool::{CallToolResult, ResourceContents, ResourceDescriptor, ToolDefinition};

/// Owns at most one live session, created on first use.
///
/// One client serves one turn (or one resource fetch); create a new client
/// per unit of work instead of sharing one across requests.
pub struct ToolSessionClient {
    connector: Arc<dyn SessionConnector>,
    session: Mutex<Option<Arc<dyn ToolSession>>>,
}

impl ToolSessionClient {
    pub fn new(connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            connector,
            session: Mutex::new(None),
        }
    }

    /// Connect if not yet connected and return the live session.
    ///
    /// Concurrent callers share one connection attempt.
    pub async fn init(&self) -> Result<Arc<dyn ToolSession>, SessionError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        debug!(transport = self.connector.label(), "Opening tool session");
        let session: Arc<dyn ToolSession> = Arc::from(self.connector.connect().await?);
        *guard = Some(session.clone());
        Ok(session)
    }

    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, SessionError> {
        self.init().await?.call_tool(name, arguments).await
    }

    pub async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, SessionError> {
        self.init().await?.read_resource(uri).await
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>, SessionError> {
        self.init().await?.list_tools().await
    }

    pub async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, SessionError> {
        self.init().await?.list_resources().await
    }

    /// Release the session. A later call connects afresh.
    pub async fn close(&self) -> Result<(), SessionError> {
        let session = self.session.lock().await.take();
        match session {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }
}
