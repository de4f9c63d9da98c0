//! Factory for creating LLM providers from configuration

use std::sync::Arc;

use crate::config::{ComposerConfig, ProviderKind};
use crate::error::{ComposerError, Result};
use crate::llm::{LLMConfig, LLMProvider};

#[cfg(feature = "llm-groq")]
use crate::llm::providers::groq::{GROQ_BASE_URL, GROQ_DEFAULT_MODEL, GroqProvider};

#[cfg(feature = "llm-fireworks")]
use crate::llm::providers::fireworks::{
    FIREWORKS_BASE_URL, FIREWORKS_DEFAULT_MODEL, FireworksProvider,
};

/// Factory for creating LLM providers
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create the provider selected by `config.provider`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider has no API key, its feature is
    /// disabled, or the HTTP client cannot be built.
    pub fn create(config: &ComposerConfig) -> Result<Arc<dyn LLMProvider>> {
        let settings = config.provider_settings().cloned().unwrap_or_default();
        let api_key = settings
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ComposerError::Configuration(format!(
                    "No API key configured for provider {:?} (set {})",
                    config.provider,
                    config.provider.api_key_env()
                ))
            })?;

        let defaults = LLMConfig::new()
            .with_temperature(config.llm.temperature)
            .with_max_tokens(config.llm.max_tokens);

        match config.provider {
            #[cfg(feature = "llm-groq")]
            ProviderKind::Groq => {
                let provider = GroqProvider::with_base_url(
                    api_key,
                    settings
                        .default_model
                        .unwrap_or_else(|| GROQ_DEFAULT_MODEL.to_string()),
                    settings
                        .base_url
                        .unwrap_or_else(|| GROQ_BASE_URL.to_string()),
                )
                .with_defaults(defaults)
                .with_timeout(config.llm.request_timeout)?;

                Ok(Arc::new(provider))
            }

            #[cfg(not(feature = "llm-groq"))]
            ProviderKind::Groq => Err(ComposerError::Configuration(
                "Groq provider requires 'llm-groq' feature".to_string(),
            )),

            #[cfg(feature = "llm-fireworks")]
            ProviderKind::Fireworks => {
                let provider = FireworksProvider::with_base_url(
                    api_key,
                    settings
                        .default_model
                        .unwrap_or_else(|| FIREWORKS_DEFAULT_MODEL.to_string()),
                    settings
                        .base_url
                        .unwrap_or_else(|| FIREWORKS_BASE_URL.to_string()),
                )
                .with_defaults(defaults)
                .with_timeout(config.llm.request_timeout)?;

                Ok(Arc::new(provider))
            }

            #[cfg(not(feature = "llm-fireworks"))]
            ProviderKind::Fireworks => Err(ComposerError::Configuration(
                "Fireworks provider requires 'llm-fireworks' feature".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;

    #[test]
    fn test_missing_key_is_rejected() {
        let result = LLMProviderFactory::create(&ComposerConfig::default());
        assert!(matches!(result, Err(ComposerError::Configuration(_))));
    }

    #[cfg(feature = "llm-groq")]
    #[test]
    fn test_create_groq() {
        let config = ComposerConfig {
            groq: Some(ProviderSettings {
                api_key: Some("gsk-test".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let provider = LLMProviderFactory::create(&config).unwrap();
        let info = provider.model_info();
        assert_eq!(info.provider, "groq");
        assert_eq!(info.model_name, GROQ_DEFAULT_MODEL);
    }

    #[cfg(feature = "llm-fireworks")]
    #[test]
    fn test_create_fireworks() {
        let config = ComposerConfig {
            provider: ProviderKind::Fireworks,
            fireworks: Some(ProviderSettings {
                api_key: Some("fw-test".to_string()),
                default_model: Some("accounts/acme/models/custom".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let provider = LLMProviderFactory::create(&config).unwrap();
        assert_eq!(provider.model_info().provider, "fireworks");
        assert_eq!(provider.model_info().model_name, "accounts/acme/models/custom");
    }
}
