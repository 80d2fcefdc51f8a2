//! Capabilities: prompt-templated operations backed by agent reasoning.
//!
//! A capability looks like a tool to the outside world (name, description,
//! input schema) but is executed by running the agent's own reasoning loop
//! over a prompt built from the caller's arguments. Capabilities exist so an
//! agent can be exposed as a tool server and composed into larger agents.

use serde::Deserialize;
use std::collections::HashMap;

fn default_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// One reasoning-backed operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentCapability {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schema")]
    pub input_schema: serde_json::Value,
    #[serde(default)]
    pub prompt_template: String,
}

impl AgentCapability {
    /// Build the capability prompt: every `{key}` span in the template is
    /// replaced with the matching argument. String arguments substitute
    /// verbatim, other values as JSON; placeholders without a matching
    /// argument are left as-is.
    pub fn format_prompt(&self, arguments: &serde_json::Value) -> String {
        let mut prompt = self.prompt_template.clone();
        if let Some(args) = arguments.as_object() {
            for (key, value) in args {
                let placeholder = format!("{{{key}}}");
                let replacement = match value.as_str() {
                    Some(text) => text.to_string(),
                    None => value.to_string(),
                };
                prompt = prompt.replace(&placeholder, &replacement);
            }
        }
        prompt
    }
}

/// Flat mapping from capability name to capability. Later registrations for
/// the same name replace earlier ones.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, AgentCapability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: AgentCapability) {
        tracing::info!(capability = %capability.name, "registered capability");
        self.capabilities.insert(capability.name.clone(), capability);
    }

    pub fn get(&self, name: &str) -> Option<&AgentCapability> {
        self.capabilities.get(name)
    }

    /// All registered capabilities, in no particular order.
    pub fn list(&self) -> Vec<&AgentCapability> {
        self.capabilities.values().collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}
