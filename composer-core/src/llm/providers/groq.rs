//! Groq LLM provider implementation

use async_trait::async_trait;
use std::time::Duration;

use super::ChatCompletionsClient;
use crate::error::{ComposerError, Result};
use crate::llm::{LLMConfig, LLMProvider, LLMRequest, LLMResponse, ModelInfo};

/// Default Groq API root
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default Groq model
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Groq LLM provider.
pub struct GroqProvider {
    inner: ChatCompletionsClient,
}

impl GroqProvider {
    /// Create a new Groq provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Groq API key
    /// * `model` - Default model (e.g., "llama-3.3-70b-versatile")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            inner: ChatCompletionsClient::new("groq", api_key, GROQ_BASE_URL, model),
        }
    }

    /// Create with a custom base URL (proxies, test servers).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: ChatCompletionsClient::new("groq", api_key, base_url, model),
        }
    }

    /// Create from environment variables.
    ///
    /// Reads from:
    /// - `GROQ_API_KEY` - API key (required)
    /// - `GROQ_MODEL` - Model name (optional, defaults to "llama-3.3-70b-versatile")
    ///
    /// # Errors
    ///
    /// Returns an error if GROQ_API_KEY is not set.
    pub fn from_env(model: Option<impl Into<String>>) -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY").map_err(|_| {
            ComposerError::Configuration("GROQ_API_KEY environment variable not set".to_string())
        })?;

        let model = model
            .map(|m| m.into())
            .or_else(|| std::env::var("GROQ_MODEL").ok())
            .unwrap_or_else(|| GROQ_DEFAULT_MODEL.to_string());

        Ok(Self::new(api_key, model))
    }

    /// Apply sampling defaults.
    pub fn with_defaults(mut self, defaults: LLMConfig) -> Self {
        self.inner = self.inner.with_defaults(defaults);
        self
    }

    /// Enforce a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.inner = self.inner.with_timeout(timeout)?;
        Ok(self)
    }

    /// Get the default model name.
    pub fn model(&self) -> &str {
        self.inner.default_model()
    }
}

#[async_trait]
impl LLMProvider for GroqProvider {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        self.inner.send(request).await
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "groq".to_string(),
            model_name: self.inner.default_model().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groq_provider_creation() {
        let provider = GroqProvider::new("test-key", "llama-3.3-70b-versatile");
        assert_eq!(provider.model(), "llama-3.3-70b-versatile");
        assert_eq!(provider.model_info().provider, "groq");
    }

    #[test]
    fn test_groq_from_env() {
        unsafe {
            std::env::remove_var("GROQ_API_KEY");
        }
        assert!(GroqProvider::from_env(Some("test-model")).is_err());

        unsafe {
            std::env::set_var("GROQ_API_KEY", "test-key");
            std::env::remove_var("GROQ_MODEL");
        }
        let provider = GroqProvider::from_env(None::<String>).unwrap();
        assert_eq!(provider.model(), GROQ_DEFAULT_MODEL);

        let provider = GroqProvider::from_env(Some("override-model")).unwrap();
        assert_eq!(provider.model(), "override-model");

        unsafe {
            std::env::remove_var("GROQ_API_KEY");
        }
    }
}
