//! Shared types for Quill.
//!
//! Holds the conversation message model and the `ModelProvider` trait that
//! decouples the orchestration loop from any concrete language-model API.

pub mod message;
pub mod provider;

pub use message::{ChatMessage, MessageRole};
pub use provider::{ModelProvider, ProviderError};
