//! LLM provider client.
//!
//! The engines are written against the [`TextGenerator`] trait so tests can
//! drive them with scripted responses; the production implementation talks
//! to the Grok chat-completions API over HTTP.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LlmError {
    /// HTTP 503 or an explicit overload message from the provider.
    #[error("the model is overloaded: {0}")]
    Overloaded(String),
    #[error("model is not found: {0}")]
    ModelNotFound(String),
    #[error("API key rejected: {0}")]
    Auth(String),
    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Only overload-class failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Overloaded(_))
    }
}

/// Single-prompt text generation seam over the LLM provider.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Grok (x.ai) chat-completions client.
pub struct GrokClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GrokClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        GrokClient {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl TextGenerator for GrokClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": 0.3,
            }))
            .send()
            .await
            .map_err(|e| LlmError::Other(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::Auth(body),
                404 => LlmError::ModelNotFound(self.model.clone()),
                503 => LlmError::Overloaded(body),
                _ if body.contains("overloaded") => LlmError::Overloaded(body),
                code => LlmError::Other(format!("provider returned {}: {}", code, body)),
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| LlmError::Other(format!("malformed completion: {}", e)))?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Other("empty completion".to_string()))
    }
}
