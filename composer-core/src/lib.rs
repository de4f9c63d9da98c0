//! # Composer - LLM composition patterns over a product catalog
//!
//! Composer runs the classic agentic workflow patterns against the KETL Mtn.
//! Apparel catalog:
//! - Prompt chaining (validate, look up, format)
//! - Routing to specialised handlers
//! - Parallel translation fan-out
//! - Orchestrator-workers recommendations
//! - Evaluator-optimizer refinement of sales pitches
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use composer_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ComposerConfig::load()?;
//!     init_logging(&config.logging);
//!
//!     let fixtures = Arc::new(InMemoryFixtureStore::default());
//!     let ctx = PatternContext::from_config(&config, fixtures)?;
//!
//!     let outcome = refine_pitch(&ctx, 5).await?;
//!     println!("{}", outcome.artifact);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **llm**: OpenAI-compatible chat completion providers (Groq, Fireworks)
//! - **fixtures**: product records, style guide and policy text
//! - **telemetry**: span sinks and logging setup
//! - **workflow**: the patterns themselves
//!
//! ## Feature Flags
//!
//! - `llm-groq`: Groq provider (default)
//! - `llm-fireworks`: Fireworks provider (default)

pub mod config;
pub mod context;
pub mod error;
pub mod fixtures;
pub mod llm;
pub mod parsing;
pub mod telemetry;
pub mod workflow;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{
        ComposerConfig, LLMSettings, LoggingSettings, ModelRoles, ProviderKind, ProviderSettings,
        RefinementSettings,
    };
    pub use crate::context::{PatternContext, PatternContextBuilder};
    pub use crate::error::{ComposerError, Result};
    pub use crate::fixtures::{FixtureStore, InMemoryFixtureStore, ProductRecord, SalesPitch};
    pub use crate::llm::{
        LLMConfig, LLMProvider, LLMProviderFactory, LLMRequest, LLMResponse, Message, MessageRole,
        StubLLMProvider,
    };
    pub use crate::parsing::{extract_json_block, JsonParser, OutputParser, ParseError, ParseResult};
    pub use crate::telemetry::{
        init_logging, kv, AttributeValue, KeyValue, LogSink, NoopSink, RecordingSink, SpanScope,
        TraceSink,
    };

    pub use crate::workflow::{
        refine_pitch, Artifact, ChainResponse, Classification, CriterionResult,
        CustomerServiceChain, Evaluator, ExecutionTrace, Generator, IterationRecord, PitchEvaluator,
        PitchGenerator, PitchSpec, ProductTranslator, PromptStep, QueryRouter, QueryType,
        Recommendation, RecommendationOrchestrator, RefinementLoop, RefinementOutcome,
        RefinementStatus, RoutedResponse, StepOutput, StepTrace, TranslationResult, Verdict,
        VerdictParse, VerdictStatus, WorkflowError, WorkflowResult,
    };
}
