//! Groq chat completions client.
//!
//! Transport and HTTP-status failures do not fail the turn: they are logged
//! and folded into an apology string returned as ordinary assistant text, so
//! the conversation keeps going. Only a response body we cannot make sense
//! of surfaces as `ProviderError`.

use async_trait::async_trait;
use quill_types::{ChatMessage, ModelProvider, ProviderError};

const GROQ_API_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

pub const DEFAULT_MODEL: &str = "llama-3.2-90b-vision-preview";

pub const AVAILABLE_MODELS: &[&str] = &[
    "llama-3.2-90b-vision-preview",
    "llama-3.2-8b-chat-preview",
    "llama-3.2-70b-chat",
    "mixtral-8x7b-32768",
    "gemma-7b-it",
];

pub struct GroqProvider {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl GroqProvider {
    /// Create a client. An unknown model name falls back to the default.
    pub fn new(api_key: impl Into<String>, model: Option<&str>) -> Self {
        let model = match model {
            Some(m) if AVAILABLE_MODELS.contains(&m) => m.to_string(),
            Some(m) => {
                tracing::warn!(model = m, default = DEFAULT_MODEL, "unknown model, using default");
                DEFAULT_MODEL.to_string()
            }
            None => DEFAULT_MODEL.to_string(),
        };
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: GROQ_API_ENDPOINT.to_string(),
            model,
        }
    }

    /// Point the client at a different endpoint. Used by tests.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for one completion: fixed sampling parameters, no streaming.
fn build_payload(model: &str, messages: &[ChatMessage]) -> serde_json::Value {
    serde_json::json!({
        "messages": messages,
        "model": model,
        "temperature": 0.7,
        "max_tokens": 4096,
        "top_p": 1.0,
        "stream": false,
        "stop": null,
    })
}

/// Pull the assistant text out of a completion response.
fn extract_content(body: &serde_json::Value) -> Result<String, ProviderError> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::InvalidResponse("no choices[0].message.content in response".to_string())
        })
}

fn apology(detail: &str) -> String {
    format!(
        "I encountered an error: Error getting Groq LLM response: {detail}. \
         Please try again or rephrase your request."
    )
}

#[async_trait]
impl ModelProvider for GroqProvider {
    async fn get_response(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let payload = build_payload(&self.model, messages);

        let response = match self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(%error, "request to Groq failed");
                return Ok(apology(&error.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            tracing::error!(%status, %details, "Groq returned an error status");
            return Ok(apology(&format!("HTTP {status}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|error| ProviderError::InvalidResponse(error.to_string()))?;
        extract_content(&body)
    }

    fn name(&self) -> &str {
        "groq"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_falls_back_to_default() {
        let provider = GroqProvider::new("key", Some("not-a-model"));
        assert_eq!(provider.model(), DEFAULT_MODEL);
        let provider = GroqProvider::new("key", Some("mixtral-8x7b-32768"));
        assert_eq!(provider.model(), "mixtral-8x7b-32768");
        let provider = GroqProvider::new("key", None);
        assert_eq!(provider.model(), DEFAULT_MODEL);
    }

    #[test]
    fn payload_carries_fixed_sampling_parameters() {
        let messages = vec![ChatMessage::user("hi")];
        let payload = build_payload("mixtral-8x7b-32768", &messages);
        assert_eq!(payload["model"], "mixtral-8x7b-32768");
        assert_eq!(payload["temperature"], 0.7);
        assert_eq!(payload["max_tokens"], 4096);
        assert_eq!(payload["top_p"], 1.0);
        assert_eq!(payload["stream"], false);
        assert!(payload["stop"].is_null());
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][0]["content"], "hi");
    }

    #[test]
    fn extract_content_reads_the_first_choice() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}}]
        });
        assert_eq!(extract_content(&body).unwrap(), "hello");
    }

    #[test]
    fn extract_content_rejects_a_malformed_body() {
        let body = serde_json::json!({"choices": []});
        let err = extract_content(&body).expect_err("empty choices");
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_the_apology_text() {
        // Nothing listens on this port.
        let provider =
            GroqProvider::new("key", None).with_endpoint("http://127.0.0.1:9/v1/chat/completions");
        let reply = provider
            .get_response(&[ChatMessage::user("hi")])
            .await
            .expect("network failure becomes text");
        assert!(reply.starts_with("I encountered an error:"), "got: {reply}");
        assert!(reply.ends_with("Please try again or rephrase your request."));
    }
}
