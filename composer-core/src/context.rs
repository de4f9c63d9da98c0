//! Shared dependencies handed to every pattern

use std::fmt;
use std::sync::Arc;

use crate::config::{ComposerConfig, ModelRoles, RefinementSettings};
use crate::error::Result;
use crate::fixtures::{FixtureStore, InMemoryFixtureStore};
use crate::llm::{LLMProvider, LLMProviderFactory};
use crate::telemetry::{LogSink, TraceSink};

/// Everything a pattern needs to run: the model provider, fixture data,
/// model ids per role, loop settings and the trace sink.
///
/// Built once and cloned cheaply into each pattern.
#[derive(Clone)]
pub struct PatternContext {
    provider: Arc<dyn LLMProvider>,
    fixtures: Arc<dyn FixtureStore>,
    sink: Arc<dyn TraceSink>,
    models: ModelRoles,
    refinement: RefinementSettings,
}

impl PatternContext {
    pub fn builder(provider: Arc<dyn LLMProvider>) -> PatternContextBuilder {
        PatternContextBuilder {
            provider,
            fixtures: None,
            sink: None,
            models: ModelRoles::default(),
            refinement: RefinementSettings::default(),
        }
    }

    /// Build a context from loaded configuration.
    ///
    /// The provider comes from [`LLMProviderFactory`]; spans go to a
    /// [`LogSink`] unless replaced with [`with_sink`](Self::with_sink).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the provider
    /// cannot be created.
    pub fn from_config(config: &ComposerConfig, fixtures: Arc<dyn FixtureStore>) -> Result<Self> {
        config.validate()?;
        let provider = LLMProviderFactory::create(config)?;

        Ok(Self::builder(provider)
            .fixtures(fixtures)
            .sink(Arc::new(LogSink::new()))
            .models(config.models.clone())
            .refinement(config.refinement.clone())
            .build())
    }

    /// Replace the trace sink
    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn provider(&self) -> &dyn LLMProvider {
        self.provider.as_ref()
    }

    pub fn fixtures(&self) -> &dyn FixtureStore {
        self.fixtures.as_ref()
    }

    pub fn sink(&self) -> &Arc<dyn TraceSink> {
        &self.sink
    }

    pub fn models(&self) -> &ModelRoles {
        &self.models
    }

    pub fn refinement(&self) -> &RefinementSettings {
        &self.refinement
    }
}

impl fmt::Debug for PatternContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternContext")
            .field("provider", &self.provider.model_info())
            .field("models", &self.models)
            .field("refinement", &self.refinement)
            .finish()
    }
}

/// Builder for [`PatternContext`]
pub struct PatternContextBuilder {
    provider: Arc<dyn LLMProvider>,
    fixtures: Option<Arc<dyn FixtureStore>>,
    sink: Option<Arc<dyn TraceSink>>,
    models: ModelRoles,
    refinement: RefinementSettings,
}

impl PatternContextBuilder {
    pub fn fixtures(mut self, fixtures: Arc<dyn FixtureStore>) -> Self {
        self.fixtures = Some(fixtures);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn models(mut self, models: ModelRoles) -> Self {
        self.models = models;
        self
    }

    pub fn refinement(mut self, refinement: RefinementSettings) -> Self {
        self.refinement = refinement;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.refinement.max_iterations = max_iterations;
        self
    }

    /// Missing fixtures default to an empty store, a missing sink to [`LogSink`].
    pub fn build(self) -> PatternContext {
        PatternContext {
            provider: self.provider,
            fixtures: self
                .fixtures
                .unwrap_or_else(|| Arc::new(InMemoryFixtureStore::default())),
            sink: self.sink.unwrap_or_else(|| Arc::new(LogSink::new())),
            models: self.models,
            refinement: self.refinement,
        }
    }
}
