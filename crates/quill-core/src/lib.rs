//! Orchestration for Quill: the reply parser that pulls embedded tool calls
//! out of model text, the tool-aware system prompt, and the bounded agent
//! loop that ties the model provider, the tool registry, and the connection
//! manager together. Capabilities expose that loop itself as callable
//! operations, so an agent can be served as a tool server.

pub mod agent;
pub mod capability;
pub mod parser;
pub mod prompt;

pub use agent::{Agent, AgentError, AgentEvent};
pub use capability::{AgentCapability, CapabilityRegistry};
pub use parser::{ParsedReply, ToolCall, parse_reply};
pub use prompt::build_system_prompt;
