//! Tools discovered from connected servers.
//!
//! A `Tool` is one remote operation plus its metadata; it reaches its server
//! by name through the `ConnectionManager`, never by holding the connection.
//! The `ToolRegistry` maps tool names to tools and is filled by discovery.

pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::{RetryPolicy, Tool, ToolError};
