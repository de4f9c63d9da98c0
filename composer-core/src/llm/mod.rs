//! Model call interface and hosted providers.
//!
//! Every pattern talks to a model through [`LLMProvider::complete`]:
//! a system prompt, a user prompt, a model identifier and an optional
//! slice of prior conversation turns in, reply text out. The call may
//! fail and it may succeed with an empty reply; callers handle both.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ComposerError, Result};

pub mod factory;
pub mod providers;

pub use factory::LLMProviderFactory;

/// Sampling defaults applied when a request does not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Temperature for generation (0.0-2.0, default: 0.7)
    pub temperature: f32,

    /// Maximum tokens to generate (default: 4000)
    pub max_tokens: usize,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

impl LLMConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }
}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request to an LLM provider
#[derive(Debug, Clone, Default)]
pub struct LLMRequest {
    /// Messages in the conversation
    pub messages: Vec<Message>,

    /// Model identifier; the provider's default model when `None`
    pub model: Option<String>,

    /// Temperature for generation (0.0-2.0)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,
}

impl LLMRequest {
    /// Build the message list for a single completion:
    /// optional system prompt, prior history, then the user prompt.
    pub fn completion(system_prompt: &str, user_prompt: &str, history: &[Message]) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if !system_prompt.trim().is_empty() {
            messages.push(Message::system(system_prompt));
        }
        messages.extend_from_slice(history);
        messages.push(Message::user(user_prompt));

        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Generated content; may be empty
    pub content: String,

    /// Token usage information
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Trait for LLM provider implementations.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a fully built request.
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse>;

    /// Single completion call.
    ///
    /// # Arguments
    ///
    /// * `system_prompt` - Instructions; omitted from the request when blank
    /// * `user_prompt` - The turn to answer
    /// * `model` - Model identifier
    /// * `history` - Prior turns, placed between system and user messages
    ///
    /// # Returns
    ///
    /// The reply text, which may be empty.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        history: Option<&[Message]>,
    ) -> Result<String> {
        let request = LLMRequest::completion(system_prompt, user_prompt, history.unwrap_or(&[]))
            .with_model(model);
        let response = self.generate_request(&request).await?;
        Ok(response.content)
    }

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
}

/// Provider that refuses every call.
///
/// Useful as a placeholder where a context must be built but no model
/// should ever be reached; every pattern degrades to its fallback output.
pub struct StubLLMProvider;

#[async_trait]
impl LLMProvider for StubLLMProvider {
    async fn generate_request(&self, _request: &LLMRequest) -> Result<LLMResponse> {
        Err(ComposerError::Llm(
            "LLM provider not configured. Implement the LLMProvider trait for your model".to_string(),
        ))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "stub".to_string(),
            model_name: "none".to_string(),
        }
    }
}
