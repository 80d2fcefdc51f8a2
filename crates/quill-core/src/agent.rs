//! The agent loop: model reply in, tool calls out, bounded chain of thought.

use crate::capability::CapabilityRegistry;
use crate::parser::{ParsedReply, ToolCall, parse_reply};
use crate::prompt::build_system_prompt;
use quill_mcp::ConnectionManager;
use quill_tools::{RetryPolicy, ToolRegistry};
use quill_types::{ChatMessage, ModelProvider, ProviderError};
use std::sync::Arc;
use thiserror::Error;

/// Default bound on tool invocations within one user turn.
pub const DEFAULT_MAX_CHAIN_LENGTH: usize = 10;

const CHAIN_LIMIT_WARNING: &str =
    "Maximum chain of thought length reached. Providing final response.";

const CAPABILITY_LIMIT_WARNING: &str = "Maximum capability processing chain length reached.";

/// Events emitted while a turn runs. Rendering is the caller's job.
#[derive(Debug)]
pub enum AgentEvent {
    /// Human-readable assistant text. `is_final` marks the turn's answer;
    /// non-final replies are the prose a model emitted alongside a tool call.
    Reply { text: String, is_final: bool },
    /// A tool is about to be invoked.
    ToolStart {
        name: String,
        arguments: serde_json::Value,
    },
    /// A tool invocation finished.
    ToolEnd { name: String, ok: bool },
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Drives one conversation: owns the message history, asks the provider for
/// replies, and executes embedded tool calls through the registry.
///
/// Tool results and tool errors both flow back into the conversation as
/// `system` messages and keep the chain going; only a plain reply, an
/// unknown tool name, or the chain bound ends a turn.
pub struct Agent<P> {
    provider: P,
    manager: Arc<ConnectionManager>,
    registry: ToolRegistry,
    capabilities: CapabilityRegistry,
    retry: RetryPolicy,
    max_chain_length: usize,
    messages: Vec<ChatMessage>,
}

impl<P: ModelProvider> Agent<P> {
    pub fn new(
        provider: P,
        manager: Arc<ConnectionManager>,
        registry: ToolRegistry,
        max_chain_length: usize,
        retry: RetryPolicy,
    ) -> Self {
        let system_prompt = build_system_prompt(&registry.list().into_iter().cloned().collect::<Vec<_>>());
        Self {
            provider,
            manager,
            registry,
            capabilities: CapabilityRegistry::new(),
            retry,
            max_chain_length,
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    /// Replace the capability set this agent serves.
    pub fn set_capabilities(&mut self, capabilities: CapabilityRegistry) {
        self.capabilities = capabilities;
    }

    /// The conversation so far, system prompt included.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    /// Run one user turn to completion.
    ///
    /// Loops while the model keeps calling tools, up to `max_chain_length`
    /// invocations. When the bound is hit, a warning is appended as a
    /// `system` message and one more reply is requested with no tool-call
    /// parsing; that reply is the turn's answer.
    pub async fn run_turn<F>(&mut self, user_input: &str, mut on_event: F) -> Result<(), AgentError>
    where
        F: FnMut(AgentEvent),
    {
        self.messages.push(ChatMessage::user(user_input));

        let mut chain_length = 0;
        let mut is_tool_call = true;
        let mut answer_shown = false;

        while is_tool_call && chain_length < self.max_chain_length {
            let reply = self.provider.get_response(&self.messages).await?;

            let (result, continues, human_text) = match parse_reply(&reply) {
                ParsedReply::Call { call, text } => {
                    let (result, continues) = self.execute_tool_call(&call, &mut on_event).await;
                    (Some(result), continues, text)
                }
                ParsedReply::Text(text) => (None, false, text),
            };

            if !human_text.trim().is_empty() {
                on_event(AgentEvent::Reply {
                    text: human_text,
                    is_final: !continues,
                });
                answer_shown = true;
            }
            self.messages.push(ChatMessage::assistant(&reply));

            if continues {
                if let Some(result) = result {
                    self.messages.push(ChatMessage::system(result));
                }
                chain_length += 1;
            } else {
                is_tool_call = false;
                if !answer_shown {
                    // A tool-call-shaped reply naming an unknown tool ends
                    // the chain; the raw reply stands as the answer.
                    on_event(AgentEvent::Reply {
                        text: reply,
                        is_final: true,
                    });
                    answer_shown = true;
                }
            }
        }

        if chain_length >= self.max_chain_length {
            tracing::warn!("{CHAIN_LIMIT_WARNING}");
            self.messages.push(ChatMessage::system(CHAIN_LIMIT_WARNING));

            let final_reply = self.provider.get_response(&self.messages).await?;
            self.messages.push(ChatMessage::assistant(&final_reply));
            on_event(AgentEvent::Reply {
                text: final_reply,
                is_final: true,
            });
        }

        Ok(())
    }

    /// Run one capability to completion and return its result text.
    ///
    /// The capability gets a fresh conversation seeded with the shared
    /// system prompt plus the formatted capability prompt; the agent's own
    /// history is untouched. The same chain bound applies, but there is no
    /// fallback model call: hitting the bound returns the last tool result.
    pub async fn execute_capability(
        &self,
        name: &str,
        arguments: &serde_json::Value,
    ) -> Result<String, AgentError> {
        let Some(capability) = self.capabilities.get(name) else {
            tracing::warn!(capability = name, "no such capability");
            return Ok(format!("No capability found with name: {name}"));
        };

        let prompt = capability.format_prompt(arguments);
        tracing::info!(capability = name, %arguments, "executing capability");

        let mut messages = vec![self.messages[0].clone(), ChatMessage::user(prompt)];
        let mut chain_length = 0;
        let mut is_tool_call = true;
        let mut result = String::new();

        while is_tool_call && chain_length < self.max_chain_length {
            let reply = self.provider.get_response(&messages).await?;
            match parse_reply(&reply) {
                ParsedReply::Call { call, .. } => {
                    let (outcome, continues) = self.execute_tool_call(&call, &mut |_| {}).await;
                    messages.push(ChatMessage::assistant(&reply));
                    result = outcome;
                    if continues {
                        messages.push(ChatMessage::system(result.clone()));
                        chain_length += 1;
                    } else {
                        is_tool_call = false;
                    }
                }
                ParsedReply::Text(text) => {
                    messages.push(ChatMessage::assistant(&reply));
                    result = text;
                    is_tool_call = false;
                }
            }
        }

        if chain_length >= self.max_chain_length {
            tracing::warn!(capability = name, "{CAPABILITY_LIMIT_WARNING}");
        }
        Ok(result)
    }

    /// Execute one parsed tool call. Returns the message destined for the
    /// conversation and whether the chain continues: success and invocation
    /// failure both continue, an unknown tool name does not.
    pub async fn execute_tool_call<F>(&self, call: &ToolCall, on_event: &mut F) -> (String, bool)
    where
        F: FnMut(AgentEvent),
    {
        let Some(tool) = self.registry.get(&call.tool) else {
            tracing::warn!(tool = %call.tool, "model named an unregistered tool");
            return (format!("No tool found with name: {}", call.tool), false);
        };

        tracing::info!(tool = %call.tool, arguments = %call.arguments, "executing tool");
        on_event(AgentEvent::ToolStart {
            name: call.tool.clone(),
            arguments: call.arguments.clone(),
        });

        match tool
            .invoke(&self.manager, call.arguments.clone(), &self.retry)
            .await
        {
            Ok(result) => {
                on_event(AgentEvent::ToolEnd {
                    name: call.tool.clone(),
                    ok: true,
                });
                (format!("Tool execution result: {result}"), true)
            }
            Err(error) => {
                tracing::error!(tool = %call.tool, %error, "tool execution failed");
                on_event(AgentEvent::ToolEnd {
                    name: call.tool.clone(),
                    ok: false,
                });
                (format!("Error executing tool: {error}"), true)
            }
        }
    }
}
