//! Server mode: expose an agent as an MCP tool server.
//!
//! The agent's discovered tools and its registered capabilities are both
//! advertised over `tools/list`; `tools/call` routes a capability through
//! the agent's reasoning loop and anything else through plain tool
//! execution. This is what lets agents nest: one agent's server is just
//! another entry in a parent agent's `[servers]` table.

pub mod server;

pub use server::AgentServer;
