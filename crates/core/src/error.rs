//! Error types for the orderchat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all orderchat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model invocation errors ---
    #[error("Model invocation failed: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool session errors ---
    #[error("Tool session error: {0}")]
    Session(#[from] SessionError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Turn request validation ---
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A turn that ended with an `error` event, re-raised by the
    /// non-streaming wrapper.
    #[error("{message}")]
    Turn { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of the tool session transport (the "connection" side).
///
/// Domain-level tool failures are *not* represented here; the gateway
/// reports those as `isError` results.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Failed to start tool server `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("Tool server connection failed: {0}")]
    Connection(String),

    #[error("Tool session is closed")]
    Closed,

    #[error("Tool server returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed tool server message: {0}")]
    Protocol(String),
}

impl SessionError {
    /// JSON-RPC code the tool server uses for an unknown resource.
    pub const RESOURCE_NOT_FOUND: i64 = -32002;

    /// Whether the server reported that the requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rpc { code, .. } if *code == Self::RESOURCE_NOT_FOUND)
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}
