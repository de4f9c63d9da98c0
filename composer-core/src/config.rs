//! Configuration types for Composer
//!
//! Configuration is an explicit value: load it once at process start and
//! hand it to [`PatternContext::from_config`](crate::context::PatternContext::from_config).
//! Nothing in the crate reads the environment after that point.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{ComposerError, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ComposerConfig {
    /// Provider used for every model call
    pub provider: ProviderKind,

    /// Groq credentials and endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groq: Option<ProviderSettings>,

    /// Fireworks credentials and endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fireworks: Option<ProviderSettings>,

    /// Sampling and transport settings
    pub llm: LLMSettings,

    /// Model identifier per pattern role
    pub models: ModelRoles,

    /// Evaluator-optimizer loop settings
    pub refinement: RefinementSettings,

    /// Log filter settings
    pub logging: LoggingSettings,
}

/// Hosted provider selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Groq,
    Fireworks,
}

impl ProviderKind {
    /// Environment variable consulted when no key is configured
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::Fireworks => "FIREWORKS_API_KEY",
        }
    }
}

/// Provider credentials and endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderSettings {
    /// API key (prefer env vars)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model used when a request names none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// Sampling and transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMSettings {
    pub temperature: f32,
    pub max_tokens: usize,

    /// HTTP request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for LLMSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4000,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Model identifier for each role a pattern plays.
///
/// Defaults are Groq model ids. Loading a Fireworks configuration swaps
/// every role still on a Groq default for a Fireworks model path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRoles {
    pub generator: String,
    pub evaluator: String,
    pub validator: String,
    pub lookup: String,
    pub formatter: String,
    pub classifier: String,
    pub product_handler: String,
    pub company_handler: String,
    pub warranty_handler: String,
    pub planner: String,
    pub worker: String,
    pub synthesizer: String,

    /// Target language -> model. Languages absent here are not translated.
    pub translation: BTreeMap<String, String>,
}

const LARGE_MODEL: &str = "llama-3.3-70b-versatile";
const SMALL_MODEL: &str = "llama-3.1-8b-instant";
const FIREWORKS_MODEL: &str = "accounts/fireworks/models/llama-v3p3-70b-instruct";
const FIREWORKS_MODEL_PREFIX: &str = "accounts/";

impl Default for ModelRoles {
    fn default() -> Self {
        let translation = [
            ("Spanish", LARGE_MODEL),
            ("French", LARGE_MODEL),
            ("German", LARGE_MODEL),
            ("Japanese", "qwen-2.5-32b"),
            ("Arabic", "mistral-saba-24b"),
        ]
        .into_iter()
        .map(|(lang, model)| (lang.to_string(), model.to_string()))
        .collect();

        Self {
            generator: LARGE_MODEL.to_string(),
            evaluator: LARGE_MODEL.to_string(),
            validator: SMALL_MODEL.to_string(),
            lookup: LARGE_MODEL.to_string(),
            formatter: SMALL_MODEL.to_string(),
            classifier: SMALL_MODEL.to_string(),
            product_handler: LARGE_MODEL.to_string(),
            company_handler: SMALL_MODEL.to_string(),
            warranty_handler: SMALL_MODEL.to_string(),
            planner: SMALL_MODEL.to_string(),
            worker: SMALL_MODEL.to_string(),
            synthesizer: SMALL_MODEL.to_string(),
            translation,
        }
    }
}

impl ModelRoles {
    /// Move every role still on its Groq default over to the `provider`
    /// default. Roles set explicitly are left alone.
    pub fn adopt_provider_defaults(&mut self, provider: ProviderKind) {
        if provider != ProviderKind::Fireworks {
            return;
        }
        let groq = Self::default();

        for (slot, groq_model) in self.role_slots_mut().into_iter().zip(groq.role_slots()) {
            if slot.as_str() == groq_model.as_str() {
                *slot = FIREWORKS_MODEL.to_string();
            }
        }
        for (language, model) in self.translation.iter_mut() {
            if groq.translation.get(language) == Some(&*model) {
                *model = FIREWORKS_MODEL.to_string();
            }
        }
    }

    /// Every (role, model) pair; translation models appear as `translation.{language}`
    pub fn assignments(&self) -> Vec<(String, &str)> {
        ROLE_NAMES
            .into_iter()
            .zip(self.role_slots())
            .map(|(role, model)| (role.to_string(), model.as_str()))
            .chain(
                self.translation
                    .iter()
                    .map(|(language, model)| (format!("translation.{}", language), model.as_str())),
            )
            .collect()
    }

    fn role_slots(&self) -> [&String; 12] {
        [
            &self.generator,
            &self.evaluator,
            &self.validator,
            &self.lookup,
            &self.formatter,
            &self.classifier,
            &self.product_handler,
            &self.company_handler,
            &self.warranty_handler,
            &self.planner,
            &self.worker,
            &self.synthesizer,
        ]
    }

    fn role_slots_mut(&mut self) -> [&mut String; 12] {
        [
            &mut self.generator,
            &mut self.evaluator,
            &mut self.validator,
            &mut self.lookup,
            &mut self.formatter,
            &mut self.classifier,
            &mut self.product_handler,
            &mut self.company_handler,
            &mut self.warranty_handler,
            &mut self.planner,
            &mut self.worker,
            &mut self.synthesizer,
        ]
    }
}

const ROLE_NAMES: [&str; 12] = [
    "generator",
    "evaluator",
    "validator",
    "lookup",
    "formatter",
    "classifier",
    "product_handler",
    "company_handler",
    "warranty_handler",
    "planner",
    "worker",
    "synthesizer",
];

/// Evaluator-optimizer loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementSettings {
    /// Maximum evaluation rounds (>= 1)
    pub max_iterations: usize,
}

impl Default for RefinementSettings {
    fn default() -> Self {
        Self { max_iterations: 3 }
    }
}

/// Log filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ComposerConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `composer.toml` in the working directory, if present
    /// 3. The file named by `COMPOSER_CONFIG_PATH`, if set
    /// 4. `COMPOSER_*` variables, `__` separating nested keys
    ///    (e.g. `COMPOSER_REFINEMENT__MAX_ITERATIONS=5`)
    /// 5. `GROQ_API_KEY` / `FIREWORKS_API_KEY` for keys still unset
    ///
    /// Model roles left on their Groq defaults follow the selected provider.
    ///
    /// # Errors
    ///
    /// Returns an error if a file is malformed or validation fails.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment =
            Figment::from(Serialized::defaults(ComposerConfig::default())).merge(Toml::file("composer.toml"));

        if let Ok(path) = std::env::var("COMPOSER_CONFIG_PATH") {
            figment = merge_file(figment, Path::new(&path))?;
        }

        let mut config: ComposerConfig = figment
            .merge(Env::prefixed("COMPOSER_").split("__"))
            .extract()
            .map_err(|e| {
                ComposerError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.resolve(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file (`.toml`, `.yaml`/`.yml`, `.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    /// API keys missing from the file are taken from the environment, as in
    /// [`load`](Self::load).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        use figment::{Figment, providers::Serialized};

        let figment = Figment::from(Serialized::defaults(ComposerConfig::default()));
        let mut config: ComposerConfig = merge_file(figment, path.as_ref())?
            .extract()
            .map_err(|e| {
                ComposerError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.resolve(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Settings for the selected provider, if any were configured.
    pub fn provider_settings(&self) -> Option<&ProviderSettings> {
        match self.provider {
            ProviderKind::Groq => self.groq.as_ref(),
            ProviderKind::Fireworks => self.fireworks.as_ref(),
        }
    }

    /// Fill missing keys from `lookup` and move default model roles onto the
    /// selected provider.
    pub fn resolve(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.apply_key_fallbacks(lookup);
        self.models.adopt_provider_defaults(self.provider);
    }

    /// Fill missing API keys from `lookup` (the process environment in [`load`](Self::load)).
    pub fn apply_key_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (kind, slot) in [
            (ProviderKind::Groq, &mut self.groq),
            (ProviderKind::Fireworks, &mut self.fireworks),
        ] {
            let has_key = slot
                .as_ref()
                .and_then(|s| s.api_key.as_ref())
                .is_some_and(|k| !k.is_empty());
            if has_key {
                continue;
            }
            if let Some(key) = lookup(kind.api_key_env()).filter(|k| !k.is_empty()) {
                slot.get_or_insert_with(ProviderSettings::default).api_key = Some(key);
            }
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the iteration budget is zero, sampling settings
    /// are out of range, the selected provider has no API key, or a Fireworks
    /// configuration names a model that is not an `accounts/...` path.
    pub fn validate(&self) -> Result<()> {
        if self.refinement.max_iterations == 0 {
            return Err(ComposerError::Configuration(
                "refinement.max_iterations must be at least 1".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ComposerError::Configuration(format!(
                "llm.temperature must be within 0.0-2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.max_tokens == 0 {
            return Err(ComposerError::Configuration(
                "llm.max_tokens must be greater than 0".to_string(),
            ));
        }

        let has_key = self
            .provider_settings()
            .and_then(|s| s.api_key.as_ref())
            .is_some_and(|k| !k.is_empty());
        if !has_key {
            return Err(ComposerError::Configuration(format!(
                "No API key configured for provider {:?} (set {})",
                self.provider,
                self.provider.api_key_env()
            )));
        }

        if self.provider == ProviderKind::Fireworks {
            if let Some((role, model)) = self
                .models
                .assignments()
                .into_iter()
                .find(|(_, model)| !model.starts_with(FIREWORKS_MODEL_PREFIX))
            {
                return Err(ComposerError::Configuration(format!(
                    "models.{} = {:?} is not a Fireworks model path (expected {}...)",
                    role, model, FIREWORKS_MODEL_PREFIX
                )));
            }
        }

        Ok(())
    }
}

fn merge_file(figment: figment::Figment, path: &Path) -> Result<figment::Figment> {
    use figment::providers::{Format, Json, Toml, Yaml};

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("toml") => Ok(figment.merge(Toml::file(path))),
        Some("yaml") | Some("yml") => Ok(figment.merge(Yaml::file(path))),
        Some("json") => Ok(figment.merge(Json::file(path))),
        _ => Err(ComposerError::Configuration(format!(
            "Unsupported configuration file type: {}",
            path.display()
        ))),
    }
}
