//! OpenAI-compatible `/chat/completions` client shared by the hosted providers

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ComposerError, Result};
use crate::llm::{LLMConfig, LLMRequest, LLMResponse, TokenUsage};

/// HTTP client for any endpoint speaking the OpenAI chat completions dialect.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    provider: &'static str,
    api_key: String,
    base_url: String,
    default_model: String,
    defaults: LLMConfig,
}

impl ChatCompletionsClient {
    /// Create a client.
    ///
    /// # Arguments
    ///
    /// * `provider` - Short provider label used in errors and logs
    /// * `api_key` - Bearer token
    /// * `base_url` - API root, without the trailing `/chat/completions`
    /// * `default_model` - Model used when a request names none
    pub fn new(
        provider: &'static str,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_model: default_model.into(),
            defaults: LLMConfig::default(),
        }
    }

    /// Replace the HTTP client with one that enforces a request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ComposerError::Configuration(format!(
                    "Failed to build {} HTTP client: {}",
                    self.provider, e
                ))
            })?;
        Ok(self)
    }

    pub fn with_defaults(mut self, defaults: LLMConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn build_body(&self, request: &LLMRequest) -> ChatRequest {
        ChatRequest {
            model: request
                .model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| self.default_model.clone()),
            messages: request
                .messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: Some(request.temperature.unwrap_or(self.defaults.temperature)),
            max_tokens: Some(request.max_tokens.unwrap_or(self.defaults.max_tokens)),
        }
    }

    /// Send one chat completion request.
    ///
    /// A reply whose message content is `null` is returned as empty text.
    ///
    /// # Errors
    ///
    /// Transport failures, non-success statuses, undecodable bodies and
    /// replies without choices.
    pub async fn send(&self, request: &LLMRequest) -> Result<LLMResponse> {
        let body = self.build_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            provider = self.provider,
            model = %body.model,
            messages = body.messages.len(),
            "sending chat completion"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ComposerError::Llm(format!("Failed to send request to {}: {}", self.provider, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ComposerError::Llm(format!(
                "{} API error ({}): {}",
                self.provider, status, text
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ComposerError::Llm(format!("Failed to parse {} response: {}", self.provider, e))
        })?;

        parsed.into_llm_response(self.provider)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

impl ChatResponse {
    fn into_llm_response(self, provider: &str) -> Result<LLMResponse> {
        let usage = self.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let choice = self.choices.into_iter().next().ok_or_else(|| {
            ComposerError::Llm(format!("{} API returned no choices", provider))
        })?;

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    fn client() -> ChatCompletionsClient {
        ChatCompletionsClient::new("groq", "key", "https://api.example.com/v1/", "default-model")
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        assert_eq!(client().base_url(), "https://api.example.com/v1");
    }

    #[test]
    fn test_body_uses_defaults_and_model_override() {
        let client = client().with_defaults(LLMConfig::new().with_max_tokens(123));
        let request = LLMRequest::completion("sys", "hi", &[]);

        let body = client.build_body(&request);
        assert_eq!(body.model, "default-model");
        assert_eq!(body.max_tokens, Some(123));
        assert_eq!(body.temperature, Some(0.7));

        let body = client.build_body(&request.with_model("qwen-2.5-32b").with_temperature(0.1));
        assert_eq!(body.model, "qwen-2.5-32b");
        assert_eq!(body.temperature, Some(0.1));
    }

    #[test]
    fn test_body_serializes_roles_lowercase() {
        let request = LLMRequest {
            messages: vec![Message::system("s"), Message::assistant("a")],
            ..LLMRequest::default()
        };
        let json = serde_json::to_value(client().build_body(&request)).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "assistant");
    }

    #[test]
    fn test_null_content_becomes_empty() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let response = parsed.into_llm_response("groq").unwrap();
        assert_eq!(response.content, "");
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_usage_and_no_choices() {
        let raw = r#"{"choices":[{"message":{"content":"hey"}}],
                      "usage":{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let response = parsed.into_llm_response("groq").unwrap();
        assert_eq!(response.content, "hey");
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(4));

        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(parsed.into_llm_response("groq").is_err());
    }
}
