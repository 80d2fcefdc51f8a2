//! The language-model client interface.
//!
//! The orchestration loop only ever sees this trait. Concrete providers live
//! in `quill-api`; tests substitute scripted implementations.

use crate::message::ChatMessage;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from a model provider.
///
/// Providers may also choose to fold transient transport failures into an
/// ordinary text reply (the Groq provider does); the loop treats returned
/// text as-is and does not retry provider errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error talking to model provider: {0}")]
    Network(String),

    #[error("model provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("model provider returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// A client for one language-model service.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send the full ordered message sequence and get the model's reply text.
    async fn get_response(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;

    /// Short provider identifier for logs.
    fn name(&self) -> &str;
}
