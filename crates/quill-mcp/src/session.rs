//! Session handle: one live, handshake-completed server connection.

use crate::config::ServerConfig;
use crate::error::McpError;
use crate::transport::StdioTransport;
use serde::Deserialize;

/// MCP protocol version we speak.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// One remote operation as reported by `tools/list`.
#[derive(Debug, Clone)]
pub struct OperationInfo {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct OperationList {
    tools: Vec<OperationEntry>,
}

#[derive(Deserialize)]
struct OperationEntry {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_schema", rename = "inputSchema")]
    input_schema: serde_json::Value,
}

fn default_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// A live session with one tool server.
///
/// Created only by `Session::establish`, which completes the handshake
/// before the handle exists; holders can always list and invoke.
pub struct Session {
    server: String,
    transport: StdioTransport,
}

impl Session {
    /// Spawn the server subprocess and perform the handshake.
    pub async fn establish(name: &str, config: &ServerConfig) -> Result<Self, McpError> {
        let transport = StdioTransport::spawn(name, config)?;

        let init_params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }
        });

        if let Err(err) = transport.request("initialize", Some(init_params)).await {
            // Handshake failed: release the subprocess before reporting.
            transport.shutdown().await;
            return Err(err);
        }

        if let Err(err) = transport
            .notify("notifications/initialized", None)
            .await
        {
            transport.shutdown().await;
            return Err(err);
        }

        tracing::info!(server = name, "session established");
        Ok(Self {
            server: name.to_string(),
            transport,
        })
    }

    /// List the operations the server exposes.
    pub async fn list_operations(&self) -> Result<Vec<OperationInfo>, McpError> {
        let result = self.transport.request("tools/list", None).await?;
        let list: OperationList =
            serde_json::from_value(result).map_err(|err| McpError::Protocol {
                server: self.server.clone(),
                message: format!("unusable tools/list response: {err}"),
            })?;
        Ok(list
            .tools
            .into_iter()
            .map(|entry| OperationInfo {
                name: entry.name,
                description: entry.description.unwrap_or_default(),
                input_schema: entry.input_schema,
            })
            .collect())
    }

    /// Invoke a remote operation by name and return its raw result value.
    pub async fn invoke(
        &self,
        operation: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        let params = serde_json::json!({
            "name": operation,
            "arguments": arguments,
        });
        self.transport.request("tools/call", Some(params)).await
    }

    /// The name of the server this session talks to.
    pub fn server_name(&self) -> &str {
        &self.server
    }

    /// Tear down the transport: kill the subprocess, stop its reader.
    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_entry_parses_full() {
        let entry: OperationEntry = serde_json::from_str(
            r#"{
                "name": "read_file",
                "description": "Read a file",
                "inputSchema": {"type": "object", "properties": {"path": {"type": "string"}}, "required": ["path"]}
            }"#,
        )
        .unwrap();
        assert_eq!(entry.name, "read_file");
        assert_eq!(entry.description.as_deref(), Some("Read a file"));
        assert_eq!(entry.input_schema["required"][0], "path");
    }

    #[test]
    fn operation_entry_defaults_schema() {
        let entry: OperationEntry = serde_json::from_str(r#"{"name": "list"}"#).unwrap();
        assert_eq!(entry.name, "list");
        assert!(entry.description.is_none());
        assert_eq!(entry.input_schema["type"], "object");
    }

    #[test]
    fn operation_list_parses() {
        let list: OperationList = serde_json::from_str(
            r#"{"tools": [{"name": "a"}, {"name": "b", "description": "second"}]}"#,
        )
        .unwrap();
        assert_eq!(list.tools.len(), 2);
        assert_eq!(list.tools[1].description.as_deref(), Some("second"));
    }
}
