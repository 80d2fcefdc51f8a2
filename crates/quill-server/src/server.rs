//! Stdio MCP server wrapped around an agent.

use quill_core::{Agent, ToolCall};
use quill_mcp::jsonrpc::Response;
use quill_types::ModelProvider;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// An incoming frame: a request when `id` is present, a notification when
/// it is not.
#[derive(Deserialize)]
struct Incoming {
    #[serde(default)]
    id: Option<u64>,
    method: String,
    #[serde(default)]
    params: Option<serde_json::Value>,
}

/// Serves one agent over newline-delimited JSON-RPC on stdio.
///
/// Requests are handled one at a time, in order: a capability call runs the
/// agent's whole reasoning chain before the next request is read.
pub struct AgentServer<P> {
    agent: Agent<P>,
    name: String,
}

impl<P: ModelProvider> AgentServer<P> {
    pub fn new(agent: Agent<P>, name: impl Into<String>) -> Self {
        Self {
            agent,
            name: name.into(),
        }
    }

    /// Serve requests until stdin closes. Stdout carries only protocol
    /// frames; all logging goes to stderr.
    pub async fn run_stdio(&self) -> std::io::Result<()> {
        tracing::info!(server = %self.name, "serving agent over stdio");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(reply) = self.handle_line(&line).await {
                stdout.write_all(reply.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }
        tracing::info!(server = %self.name, "stdin closed, shutting down");
        Ok(())
    }

    /// Handle one raw frame. Returns the serialized response, or `None` for
    /// notifications and lines that are not JSON-RPC at all.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let incoming: Incoming = match serde_json::from_str(line) {
            Ok(incoming) => incoming,
            Err(err) => {
                tracing::warn!(server = %self.name, %err, "discarding unparseable frame");
                return None;
            }
        };

        let Some(id) = incoming.id else {
            tracing::debug!(server = %self.name, method = %incoming.method, "notification");
            return None;
        };

        let response = self.dispatch(id, &incoming.method, incoming.params).await;
        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::error!(server = %self.name, %err, "failed to serialize response");
                Some(
                    serde_json::to_string(&Response::failure(id, -32603, "internal error"))
                        .expect("static error response serializes"),
                )
            }
        }
    }

    async fn dispatch(
        &self,
        id: u64,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Response {
        match method {
            "initialize" => Response::success(
                id,
                serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "serverInfo": {
                        "name": self.name,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            ),
            "tools/list" => self.list_tools(id),
            "tools/call" => self.call_tool(id, params).await,
            other => Response::failure(id, -32601, format!("method not found: {other}")),
        }
    }

    /// Advertise the agent's discovered tools and its capabilities as one
    /// flat tool list.
    fn list_tools(&self, id: u64) -> Response {
        let mut tools: Vec<serde_json::Value> = self
            .agent
            .registry()
            .list()
            .into_iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                })
            })
            .collect();
        for capability in self.agent.capabilities().list() {
            tools.push(serde_json::json!({
                "name": capability.name,
                "description": capability.description,
                "inputSchema": capability.input_schema,
            }));
        }
        tracing::debug!(server = %self.name, count = tools.len(), "listing tools");
        Response::success(id, serde_json::json!({"tools": tools}))
    }

    /// Route a call: capabilities run through the agent's reasoning loop,
    /// everything else through plain tool execution. Failures come back as
    /// result text, the way the agent itself reports them.
    async fn call_tool(&self, id: u64, params: Option<serde_json::Value>) -> Response {
        let Some(params) = params else {
            return Response::failure(id, -32602, "missing params");
        };
        let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
            return Response::failure(id, -32602, "missing tool name");
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));

        tracing::info!(server = %self.name, tool = name, "handling tools/call");
        let text = if self.agent.capabilities().get(name).is_some() {
            match self.agent.execute_capability(name, &arguments).await {
                Ok(text) => text,
                Err(err) => format!("Error executing tool/capability {name}: {err}"),
            }
        } else {
            let call = ToolCall {
                tool: name.to_string(),
                arguments,
            };
            let (outcome, _) = self.agent.execute_tool_call(&call, &mut |_| {}).await;
            outcome
        };

        Response::success(
            id,
            serde_json::json!({
                "content": [{"type": "text", "text": text}],
                "isError": false,
            }),
        )
    }
}
