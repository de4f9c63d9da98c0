//! Agentic workflow patterns for KETL Mtn. customer interactions
//!
//! Every pattern is built from traced [`PromptStep`]s over a shared
//! [`PatternContext`](crate::context::PatternContext):
//!
//! - **Prompt chaining**: validate → look up → format ([`CustomerServiceChain`])
//! - **Routing**: classify, then dispatch to a specialist ([`QueryRouter`])
//! - **Parallelization**: concurrent per-field translation ([`ProductTranslator`])
//! - **Orchestrator-workers**: plan, delegate, synthesize ([`RecommendationOrchestrator`])
//! - **Evaluator-optimizer**: generate, review, revise ([`RefinementLoop`], [`refine_pitch`])
//!
//! # Example
//!
//! ```rust,ignore
//! use composer_core::workflow::{QueryRouter, refine_pitch};
//!
//! let mut history = Vec::new();
//! let routed = QueryRouter::new(ctx.clone())
//!     .route("Does the Vent Hoodie pack down small?", &mut history)
//!     .await;
//! println!("[{}] {}", routed.classification.query_type, routed.answer);
//!
//! let outcome = refine_pitch(&ctx, 5).await?;
//! println!("{} after {} rounds", outcome.artifact, outcome.generations());
//! ```
//!
//! Pattern calls never fail because a model call failed: each step carries
//! its failure as data and the pattern substitutes a documented fallback.

mod chain;
mod classifier;
mod evaluator_optimizer;
mod execution;
mod orchestrator;
mod parallel;
mod pitch;
mod planner;
mod router;
mod step;
mod verdict;
mod voice;

#[cfg(test)]
mod test_support;

pub use chain::{is_valid_reply, ChainResponse, CustomerServiceChain, LOOKUP_UNAVAILABLE, REFUSAL_PREFIX};
pub use classifier::{Classification, QueryClassifier, QueryType, UNREADABLE_QUERY};
pub use evaluator_optimizer::{
    next_state, Artifact, Evaluator, Generator, IterationRecord, RefinementConfig, RefinementLoop,
    RefinementLoopBuilder, RefinementOutcome, RefinementState, RefinementStatus,
};
pub use execution::{ExecutionTrace, StepTrace, WorkflowError, WorkflowResult};
pub use orchestrator::{
    fallback_matches, fallback_profile, Recommendation, RecommendationOrchestrator, WorkerResult,
    MATCHING_SAMPLE_SIZE, NO_RECOMMENDATION,
};
pub use parallel::{
    LanguageTranslation, ProductField, ProductText, ProductTranslation, ProductTranslator,
    TranslationResult,
};
pub use pitch::{
    placeholder_pitch, refine_pitch, PitchEvaluator, PitchGenerator, PitchSpec, PITCH_RUBRIC,
};
pub use planner::{default_tasks, parse_plan, TaskDefinition, TaskPlanner, PRODUCT_MATCHING, PROFILE_ANALYSIS};
pub use router::{QueryRouter, RoutedResponse, CLARIFICATION_REQUEST, HANDLER_UNAVAILABLE};
pub use step::{PromptStep, StepFailure, StepOutput};
pub use verdict::{
    parse_verdict, CriterionResult, Verdict, VerdictParse, VerdictStatus, CRITERION_PASS_SCORE,
    EMPTY_EVALUATION_FEEDBACK,
};
pub use voice::{format_in_brand_voice, FORMAT_STEP};
