//! Per-server launch configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_timeout() -> u64 {
    30_000
}

/// How a server is reached. Only subprocess stdio for now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Stdio,
}

/// Launch description for one tool server. Immutable once loaded; the
/// server's name is the key under which this config is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Command to run (e.g. "npx", "python").
    pub command: String,
    /// Arguments to pass to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment overlay merged onto the parent process environment.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Per-request timeout in milliseconds (default: 30000).
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Transport used to reach the server.
    #[serde(default)]
    pub transport: TransportKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let cfg: ServerConfig = toml::from_str(
            r#"
command = "npx"
args = ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.command, "npx");
        assert_eq!(cfg.args.len(), 3);
        assert!(cfg.env.is_empty());
        assert_eq!(cfg.timeout_ms, 30_000);
        assert_eq!(cfg.transport, TransportKind::Stdio);
    }

    #[test]
    fn parse_env_overlay_and_timeout() {
        let cfg: ServerConfig = toml::from_str(
            r#"
command = "python"
args = ["server.py"]
env = { API_TOKEN = "t0ken" }
timeout_ms = 5000
"#,
        )
        .unwrap();
        assert_eq!(cfg.env["API_TOKEN"], "t0ken");
        assert_eq!(cfg.timeout_ms, 5000);
    }

    #[test]
    fn parse_explicit_transport() {
        let cfg: ServerConfig = toml::from_str(
            r#"
command = "deno"
transport = "stdio"
"#,
        )
        .unwrap();
        assert_eq!(cfg.transport, TransportKind::Stdio);
    }
}
