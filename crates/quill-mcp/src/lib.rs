//! MCP connection core for Quill.
//!
//! Talks to stdio-based tool servers that speak newline-delimited JSON-RPC
//! 2.0. Each configured server is spawned as a child process and taken
//! through the MCP handshake by a `ServerConnection`, which owns the whole
//! lifecycle in a single dedicated task. The `ConnectionManager` tracks
//! connections by name and hands out ready `Session` handles.

pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod jsonrpc;
pub mod manager;
pub mod session;
mod transport;

pub use config::{ServerConfig, TransportKind};
pub use connection::{ConnectionState, ServerConnection};
pub use directory::SessionDirectory;
pub use error::McpError;
pub use manager::ConnectionManager;
pub use session::{OperationInfo, Session};
