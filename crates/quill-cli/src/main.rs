//! Quill CLI — chat with a model that can call MCP tools.

use anyhow::Result;
use clap::Parser;
use quill_api::GroqProvider;
use quill_config::AppConfig;
use quill_core::{Agent, AgentEvent, CapabilityRegistry};
use quill_mcp::{ConnectionManager, ConnectionState};
use quill_server::AgentServer;
use quill_tools::{RetryPolicy, ToolRegistry};
use std::io::{self, Write};
use tokio::io::AsyncBufReadExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "quill", version, about = "A tool-using chat agent over MCP tool servers")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "quill.toml")]
    config: PathBuf,

    /// Model to use (overrides the config file)
    #[arg(long)]
    model: Option<String>,

    /// Send a single prompt and print the response (non-interactive)
    #[arg(short, long)]
    print: Option<String>,

    /// Serve this agent as an MCP tool server over stdio instead of chatting
    #[arg(long)]
    server_mode: bool,

    /// Name to advertise in server mode (overrides the config file)
    #[arg(long)]
    server_name: Option<String>,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;
    let model = cli.model.or_else(|| config.model.clone());
    let provider = GroqProvider::new(&config.api_key, model.as_deref());

    // Bring up every configured server. A server that fails to come up is
    // logged and contributes no tools; chat still works without it.
    let manager = Arc::new(ConnectionManager::new());
    for (name, server) in &config.servers {
        let conn = manager.connect(name, server.clone()).await;
        if conn.state() == ConnectionState::Failed {
            tracing::error!(server = %name, "server failed to initialize");
        }
    }

    let mut registry = ToolRegistry::new();
    let tool_count = registry.load_all(&manager).await;
    if tool_count == 0 {
        tracing::warn!("no tools available; continuing without tools");
    } else {
        tracing::info!(tool_count, "tools ready");
    }

    let retry = RetryPolicy {
        attempts: config.agent.tool_retries,
        delay: Duration::from_millis(config.agent.tool_retry_delay_ms),
    };
    let mut agent = Agent::new(
        provider,
        Arc::clone(&manager),
        registry,
        config.agent.max_chain_length,
        retry,
    );
    if !config.capabilities.is_empty() {
        let mut capabilities = CapabilityRegistry::new();
        for capability in config.capabilities.clone() {
            capabilities.register(capability);
        }
        agent.set_capabilities(capabilities);
    }

    let result = if cli.server_mode {
        let name = cli
            .server_name
            .or_else(|| config.server_name.clone())
            .unwrap_or_else(|| "quill-agent".to_string());
        AgentServer::new(agent, name).run_stdio().await.map_err(Into::into)
    } else {
        match cli.print {
            Some(prompt) => agent.run_turn(&prompt, print_event).await.map_err(Into::into),
            None => repl(&mut agent).await,
        }
    };

    manager.disconnect_all().await;
    result
}

fn print_event(event: AgentEvent) {
    if let AgentEvent::Reply { text, .. } = event {
        println!("Assistant: {text}");
    }
}

async fn repl(agent: &mut Agent<GroqProvider>) -> Result<()> {
    eprintln!("quill v{} — type 'quit' or 'exit' to leave", env!("CARGO_PKG_VERSION"));
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("You: ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }

        if let Err(error) = agent.run_turn(input, print_event).await {
            eprintln!("Error: {error}");
        }
    }

    Ok(())
}
