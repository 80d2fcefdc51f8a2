//! Error types for tool-server communication.

use thiserror::Error;

/// Errors from tool-server sessions and their lifecycle.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("failed to spawn tool server '{name}': {source}")]
    SpawnFailed {
        name: String,
        source: std::io::Error,
    },

    #[error("JSON-RPC error from '{server}' (code {code}): {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },

    #[error("protocol error from '{server}': {message}")]
    Protocol { server: String, message: String },

    #[error("tool server '{name}' timed out after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },

    #[error("tool server '{name}' terminated")]
    Terminated { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
