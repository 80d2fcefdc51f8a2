//! Tool registry: name → tool, filled by discovery.

use crate::tool::Tool;
use quill_mcp::ConnectionManager;
use std::collections::HashMap;

/// Flat mapping from tool name to tool. Later registrations for the same
/// name replace earlier ones.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// All registered tools, in no particular order.
    pub fn list(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    pub fn clear(&mut self) {
        self.tools.clear();
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Ask one server for its operations and register each as a tool bound
    /// to that server's name. A server with no live session, or a discovery
    /// call that fails, contributes nothing; the error is logged, not
    /// propagated, so one bad server never blocks the rest.
    pub async fn discover(&mut self, manager: &ConnectionManager, server: &str) -> Vec<Tool> {
        let Some(session) = manager.get_session(server).await else {
            tracing::warn!(server, "no session, skipping tool discovery");
            return Vec::new();
        };
        let operations = match session.list_operations().await {
            Ok(ops) => ops,
            Err(error) => {
                tracing::warn!(server, %error, "tool discovery failed");
                return Vec::new();
            }
        };

        let mut discovered = Vec::with_capacity(operations.len());
        for op in operations {
            let tool = Tool::new(op.name, op.description, op.input_schema, server);
            tracing::debug!(tool = %tool.name, server, "discovered tool");
            self.register(tool.clone());
            discovered.push(tool);
        }
        tracing::info!(server, count = discovered.len(), "registered tools");
        discovered
    }

    /// Run discovery against every connected server. Returns how many tools
    /// the registry holds afterwards.
    pub async fn load_all(&mut self, manager: &ConnectionManager) -> usize {
        for server in manager.server_names() {
            self.discover(manager, &server).await;
        }
        self.len()
    }
}
