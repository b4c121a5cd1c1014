//! Text-transformation service client.
//!
//! The pipeline only ever sends one user message and reads one completion
//! back; no conversation state is kept between calls.

pub mod types;

pub use types::{ChatRequest, Message};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{ConfigError, LlmError};
use crate::models::config::{LlmConfig, env_secret};

/// Stateless single-turn text completion.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send `prompt` as a single user message and return the completion text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// OpenAI-compatible chat completion client (Fireworks by default).
#[derive(Clone)]
pub struct ChatClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl ChatClient {
    /// Create a client with an explicit API key.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: LlmConfig::default().base_url,
            model: model.into(),
            temperature: None,
        }
    }

    /// Create a client, reading the API key from the configured variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ConfigError> {
        let api_key = env_secret(&config.api_key_env)?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Http(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Chat completion.
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Completion request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Completion API error");
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let chat_response: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = first_choice(chat_response)?;

        debug!(
            model = %request.model,
            chars = content.len(),
            duration_ms = start.elapsed().as_millis(),
            "Chat completion"
        );

        Ok(content)
    }
}

#[async_trait]
impl CompletionService for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest::single_turn(&self.model, prompt).temperature(self.temperature);
        self.chat_completion(&request).await
    }
}

fn first_choice(response: types::ChatResponseRaw) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| LlmError::Api("no choices in completion".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_client_builder() {
        let client = ChatClient::new("fw-test", "some-model").with_base_url("https://custom.api.com/v1");

        assert_eq!(client.api_key, "fw-test");
        assert_eq!(client.base_url(), "https://custom.api.com/v1");
        assert_eq!(client.model(), "some-model");
    }

    #[test]
    fn test_single_turn_request() {
        let request = ChatRequest::single_turn("m", "hello");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "model": "m",
                "messages": [{ "role": "user", "content": "hello" }]
            })
        );
    }

    #[test]
    fn test_first_choice() {
        let raw: types::ChatResponseRaw = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"ok"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice(raw).unwrap(), "ok");

        let empty: types::ChatResponseRaw = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_choice(empty), Err(LlmError::Api(_))));
    }
}
