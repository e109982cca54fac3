//! Ways of reaching the tool server.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use orderchat_config::{ToolServerConfig, ToolTransport};
use orderchat_core::error::SessionError;
use orderchat_core::session::{SessionConnector, ToolSession};
use orderchat_tool_server::ToolServer;

use crate::rpc::{Peer, RpcSession};

/// Spawns the tool server as a child process and speaks over its stdio.
pub struct StdioConnector {
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl StdioConnector {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Without a configured command, re-launch the running executable.
    pub fn from_config(config: &ToolServerConfig) -> Result<Self, SessionError> {
        let command = match &config.command {
            Some(command) => command.clone(),
            None => std::env::current_exe()
                .map_err(|e| SessionError::Spawn {
                    command: "<current executable>".into(),
                    reason: e.to_string(),
                })?
                .to_string_lossy()
                .into_owned(),
        };
        Ok(Self::new(command, config.args.clone()).with_env(config.env.clone()))
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl SessionConnector for StdioConnector {
    fn label(&self) -> &str {
        "stdio"
    }

    async fn connect(&self) -> Result<Box<dyn ToolSession>, SessionError> {
        debug!(command = %self.command, args = ?self.args, "Spawning tool server");

        let spawn_error = |reason: String| SessionError::Spawn {
            command: self.command.clone(),
            reason,
        };

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error("stdin was not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error("stdout was not captured".into()))?;

        let session = RpcSession::start(stdout, Box::new(stdin), Peer::Process(child));
        handshake(session).await
    }
}

/// Runs a [`ToolServer`] on a task in this process, over in-memory pipes.
pub struct InProcessConnector {
    server: Arc<ToolServer>,
}

impl InProcessConnector {
    pub fn new(server: Arc<ToolServer>) -> Self {
        Self { server }
    }

    /// The built-in order tools and layouts.
    pub fn builtin() -> Result<Self, SessionError> {
        let server = ToolServer::builtin().map_err(|e| SessionError::Protocol(e.to_string()))?;
        Ok(Self::new(Arc::new(server)))
    }
}

#[async_trait]
impl SessionConnector for InProcessConnector {
    fn label(&self) -> &str {
        "in_process"
    }

    async fn connect(&self) -> Result<Box<dyn ToolSession>, SessionError> {
        let (client_write, server_read) = tokio::io::duplex(64 * 1024);
        let (server_write, client_read) = tokio::io::duplex(64 * 1024);

        let server = self.server.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = server.serve(server_read, server_write).await {
                warn!(error = %e, "In-process tool server stopped");
            }
        });

        let session = RpcSession::start(client_read, Box::new(client_write), Peer::Task(task));
        handshake(session).await
    }
}

async fn handshake(session: RpcSession) -> Result<Box<dyn ToolSession>, SessionError> {
    if let Err(e) = session.initialize().await {
        let _ = session.close().await;
        return Err(e);
    }
    Ok(Box::new(session))
}

/// Build the connector selected by configuration.
pub fn connector_for(config: &ToolServerConfig) -> Result<Arc<dyn SessionConnector>, SessionError> {
    let connector: Arc<dyn SessionConnector> = match config.transport {
        ToolTransport::Stdio => {
            let stdio = StdioConnector::from_config(config)?;
            info!(command = %stdio.command(), args = ?config.args, "Using stdio tool server");
            Arc::new(stdio)
        }
        ToolTransport::InProcess => {
            info!("Using in-process tool server");
            Arc::new(InProcessConnector::builtin()?)
        }
    };
    Ok(connector)
}
