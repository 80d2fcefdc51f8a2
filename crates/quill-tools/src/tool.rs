//! One discovered remote operation.

use quill_mcp::{ConnectionManager, McpError};
use std::time::Duration;
use thiserror::Error;

/// Errors from invoking a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("server '{server}' has no live session")]
    Unavailable { server: String },

    #[error("tool '{tool}' failed: {source}")]
    Invocation {
        tool: String,
        #[source]
        source: McpError,
    },
}

/// How invocation failures are retried: a bounded number of attempts with a
/// fixed delay in between. A missing session is never retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay: Duration::from_secs(1),
        }
    }
}

/// A remote operation: name, description, parameter schema, and the name of
/// the server that owns it. Immutable once registered.
#[derive(Debug, Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    pub server: String,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
        server: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            server: server.into(),
        }
    }

    /// Render this tool for the model-facing system prompt: the description
    /// plus one line per parameter, with `(required)` markers taken from the
    /// schema.
    pub fn format_for_prompt(&self) -> String {
        let mut args = Vec::new();
        if let Some(props) = self.input_schema.get("properties").and_then(|v| v.as_object()) {
            let required: Vec<&str> = self
                .input_schema
                .get("required")
                .and_then(|v| v.as_array())
                .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            for (param, info) in props {
                let description = info
                    .get("description")
                    .and_then(|v| v.as_str())
                    .unwrap_or("No description");
                let mut line = format!("- {param}: {description}");
                if required.contains(&param.as_str()) {
                    line.push_str(" (required)");
                }
                args.push(line);
            }
        }

        format!(
            "\nTool: {}\nDescription: {}\nArguments:\n{}\nServer: {}\n",
            self.name,
            self.description,
            args.join("\n"),
            self.server,
        )
    }

    /// Invoke the operation through the connection manager.
    ///
    /// The session is looked up fresh on every attempt; a missing session
    /// fails immediately rather than being retried, which is also how an
    /// invocation already in flight notices that its server was torn down.
    /// Invocation failures are retried per `retry`, intermediate failures
    /// logged and swallowed, the last one propagated.
    pub async fn invoke(
        &self,
        manager: &ConnectionManager,
        arguments: serde_json::Value,
        retry: &RetryPolicy,
    ) -> Result<serde_json::Value, ToolError> {
        let mut attempt = 0;
        loop {
            let Some(session) = manager.get_session(&self.server).await else {
                return Err(ToolError::Unavailable {
                    server: self.server.clone(),
                });
            };

            tracing::debug!(tool = %self.name, server = %self.server, attempt, "invoking tool");
            match session.invoke(&self.name, arguments.clone()).await {
                Ok(result) => return Ok(result),
                Err(source) => {
                    attempt += 1;
                    if attempt < retry.attempts {
                        tracing::warn!(
                            tool = %self.name,
                            %source,
                            attempt,
                            of = retry.attempts,
                            "tool invocation failed, retrying"
                        );
                        tokio::time::sleep(retry.delay).await;
                    } else {
                        tracing::error!(tool = %self.name, %source, "tool invocation failed, out of retries");
                        return Err(ToolError::Invocation {
                            tool: self.name.clone(),
                            source,
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_tool() -> Tool {
        Tool::new(
            "get_weather",
            "Fetch the current weather",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string", "description": "City name"},
                    "units": {"type": "string"}
                },
                "required": ["city"]
            }),
            "utilities",
        )
    }

    #[test]
    fn prompt_format_lists_parameters() {
        let text = weather_tool().format_for_prompt();
        assert!(text.contains("Tool: get_weather"));
        assert!(text.contains("Description: Fetch the current weather"));
        assert!(text.contains("- city: City name (required)"));
        assert!(text.contains("- units: No description"));
        assert!(!text.contains("units: No description (required)"));
        assert!(text.contains("Server: utilities"));
    }

    #[test]
    fn prompt_format_without_properties() {
        let tool = Tool::new("ping", "Ping", serde_json::json!({"type": "object"}), "s");
        let text = tool.format_for_prompt();
        assert!(text.contains("Tool: ping"));
        assert!(text.contains("Arguments:\n\n"));
    }

    #[test]
    fn default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 2);
        assert_eq!(policy.delay, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn invoke_without_session_fails_immediately() {
        let manager = ConnectionManager::new();
        let started = std::time::Instant::now();
        let err = weather_tool()
            .invoke(&manager, serde_json::json!({}), &RetryPolicy::default())
            .await
            .expect_err("no session");
        assert!(matches!(err, ToolError::Unavailable { ref server } if server == "utilities"));
        // No retry delay may have been spent on the way out.
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
