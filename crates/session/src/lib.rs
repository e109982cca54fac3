//! Tool session client for orderchat.
//!
//! [`ToolSessionClient`] lazily opens one session through a
//! [`SessionConnector`](orderchat_core::SessionConnector). Two connectors
//! are provided: [`StdioConnector`] spawns the tool server as a child process,
//! [`InProcessConnector`] runs it on a task behind in-memory pipes. Both
//! speak the same line-delimited JSON-RPC through [`RpcSession`].

pub mod client;
pub mod connect;
pub mod rpc;

pub use client::ToolSessionClient;
pub use connect::{InProcessConnector, StdioConnector, connector_for};
pub use rpc::{Peer, RpcSession};
