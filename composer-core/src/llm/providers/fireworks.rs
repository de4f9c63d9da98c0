//! Fireworks AI provider (OpenAI-compatible inference endpoint)

use async_trait::async_trait;
use std::time::Duration;

use super::ChatCompletionsClient;
use crate::error::{ComposerError, Result};
use crate::llm::{LLMConfig, LLMProvider, LLMRequest, LLMResponse, ModelInfo};

pub const FIREWORKS_BASE_URL: &str = "https://api.fireworks.ai/inference/v1";

pub const FIREWORKS_DEFAULT_MODEL: &str = "accounts/fireworks/models/llama-v3p3-70b-instruct";

/// Fireworks AI provider.
///
/// Fireworks model identifiers are account-scoped paths such as
/// `accounts/fireworks/models/llama-v3p3-70b-instruct`; Groq-style short
/// names will be rejected by the API.
pub struct FireworksProvider {
    inner: ChatCompletionsClient,
}

impl FireworksProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            inner: ChatCompletionsClient::new("fireworks", api_key, FIREWORKS_BASE_URL, model),
        }
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: ChatCompletionsClient::new("fireworks", api_key, base_url, model),
        }
    }

    /// Create from `FIREWORKS_API_KEY` and optional `FIREWORKS_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns an error if FIREWORKS_API_KEY is not set.
    pub fn from_env(model: Option<impl Into<String>>) -> Result<Self> {
        let api_key = std::env::var("FIREWORKS_API_KEY").map_err(|_| {
            ComposerError::Configuration(
                "FIREWORKS_API_KEY environment variable not set".to_string(),
            )
        })?;

        let model = model
            .map(|m| m.into())
            .or_else(|| std::env::var("FIREWORKS_MODEL").ok())
            .unwrap_or_else(|| FIREWORKS_DEFAULT_MODEL.to_string());

        Ok(Self::new(api_key, model))
    }

    pub fn with_defaults(mut self, defaults: LLMConfig) -> Self {
        self.inner = self.inner.with_defaults(defaults);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.inner = self.inner.with_timeout(timeout)?;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        self.inner.default_model()
    }
}

#[async_trait]
impl LLMProvider for FireworksProvider {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        self.inner.send(request).await
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "fireworks".to_string(),
            model_name: self.inner.default_model().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fireworks_provider_creation() {
        let provider = FireworksProvider::with_base_url("k", FIREWORKS_DEFAULT_MODEL, "http://localhost:9/v1");
        assert_eq!(provider.model(), FIREWORKS_DEFAULT_MODEL);
        assert_eq!(provider.model_info().provider, "fireworks");
    }

    #[test]
    fn test_fireworks_from_env_missing_key() {
        unsafe {
            std::env::remove_var("FIREWORKS_API_KEY");
        }
        assert!(FireworksProvider::from_env(None::<String>).is_err());
    }
}
