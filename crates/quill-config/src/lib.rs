//! TOML configuration for Quill.
//!
//! One file holds the provider credentials, the agent loop knobs, the tool
//! server launch table, and the capability list for server mode. A missing
//! file is not an error: defaults apply and the API key can come from the
//! environment instead.

use quill_core::AgentCapability;
use quill_mcp::ServerConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MAX_CHAIN_LENGTH: usize = 10;
pub const DEFAULT_TOOL_RETRIES: u32 = 2;
pub const DEFAULT_TOOL_RETRY_DELAY_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("no API key: set GROQ_API_KEY or [provider].api_key in the config file")]
    MissingApiKey,
}

/// `[provider]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// `[agent]` section. Every knob has a default so the section can be
/// partial or absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub max_chain_length: usize,
    pub tool_retries: u32,
    pub tool_retry_delay_ms: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_chain_length: DEFAULT_MAX_CHAIN_LENGTH,
            tool_retries: DEFAULT_TOOL_RETRIES,
            tool_retry_delay_ms: DEFAULT_TOOL_RETRY_DELAY_MS,
        }
    }
}

/// `[server]` section: identity when the agent itself is served as a tool
/// server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerModeSettings {
    pub name: Option<String>,
}

/// The raw shape of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub server: ServerModeSettings,
    #[serde(default)]
    pub servers: HashMap<String, ServerConfig>,
    #[serde(default)]
    pub capabilities: Vec<AgentCapability>,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub model: Option<String>,
    pub agent: AgentSettings,
    pub server_name: Option<String>,
    pub servers: HashMap<String, ServerConfig>,
    pub capabilities: Vec<AgentCapability>,
}

impl AppConfig {
    /// Load configuration from `path`. The file's `[provider].api_key` wins
    /// over the `GROQ_API_KEY` environment variable; having neither is an
    /// error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            toml::from_str::<SettingsFile>(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            SettingsFile::default()
        };

        let api_key = settings
            .provider
            .api_key
            .or_else(|| std::env::var("GROQ_API_KEY").ok())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            api_key,
            model: settings.provider.model,
            agent: settings.agent,
            server_name: settings.server.name,
            servers: settings.servers,
            capabilities: settings.capabilities,
        })
    }
}
