//! Sales pitch generation and review on top of the refinement loop

use async_trait::async_trait;
use tracing::{debug, info};

use crate::context::PatternContext;
use crate::fixtures::ProductRecord;
use crate::telemetry::kv;

use super::evaluator_optimizer::{Artifact, Evaluator, Generator, RefinementLoop, RefinementOutcome};
use super::execution::WorkflowResult;
use super::step::{PromptStep, StepFailure};
use super::verdict::{parse_verdict, VerdictParse};

/// Criteria every pitch is judged on, in rubric order
pub const PITCH_RUBRIC: [(&str, &str); 6] = [
    ("Brand Voice", "Authentic, conversational, aligned with KETL's voice"),
    ("Feature Completeness", "Covers key product features and benefits"),
    ("Technical Accuracy", "All claims are factually correct"),
    ("Persuasiveness", "Compelling and likely to drive action"),
    ("Policy Mention", "Includes lifetime repair guarantee and shipping/returns"),
    ("Conciseness", "Around 75-100 words (speakable in ~30 seconds)"),
];

/// What a pitch is written about
#[derive(Debug, Clone, PartialEq)]
pub struct PitchSpec {
    pub product: ProductRecord,
    pub style_guide: String,
}

impl PitchSpec {
    pub fn new(product: ProductRecord, style_guide: impl Into<String>) -> Self {
        Self {
            product,
            style_guide: style_guide.into(),
        }
    }

    /// Resolve `product_id` through the fixture store; never fails.
    pub fn for_product(ctx: &PatternContext, product_id: u32) -> Self {
        let fixtures = ctx.fixtures();
        Self::new(fixtures.product(product_id), fixtures.style_guide())
    }

    fn product_json(&self) -> String {
        serde_json::to_string_pretty(&self.product).unwrap_or_else(|_| self.product.name.clone())
    }
}

/// Artifact used when the generator produced nothing
pub fn placeholder_pitch(product_name: &str) -> Artifact {
    Artifact::new(format!("[Placeholder pitch for {}]", product_name))
}

/// Writes pitches with the generator model
#[derive(Debug, Clone)]
pub struct PitchGenerator {
    ctx: PatternContext,
}

impl PitchGenerator {
    pub fn new(ctx: PatternContext) -> Self {
        Self { ctx }
    }

    fn system_prompt(spec: &PitchSpec, feedback: Option<&str>) -> String {
        let mut prompt = format!(
            "You are an expert copywriter for KETL Mtn. Apparel, creating compelling sales pitches.\n\n\
             PRODUCT INFORMATION:\n{}\n\n\
             BRAND VOICE GUIDELINES:\n{}\n\n",
            spec.product_json(),
            spec.style_guide
        );
        if let Some(feedback) = feedback {
            prompt.push_str(&format!("FEEDBACK FROM PREVIOUS EVALUATION:\n{}\n\n", feedback));
        }
        prompt.push_str(
            "Create a concise, compelling sales pitch (around 75-100 words) that:\n\
             - Uses authentic, conversational language aligned with KETL's brand voice\n\
             - Highlights key product features and benefits\n\
             - Mentions our lifetime repair guarantee and free shipping/returns\n\
             - Is technically accurate based on the product data\n\
             - Is persuasive and drives action",
        );
        prompt
    }
}

#[async_trait]
impl Generator<PitchSpec> for PitchGenerator {
    async fn generate(&self, spec: &PitchSpec, feedback: Option<&str>) -> Artifact {
        debug!(product = %spec.product.name, revising = feedback.is_some(), "generating pitch");

        let output = PromptStep::new("generate_pitch", &self.ctx.models().generator)
            .system_prompt(Self::system_prompt(spec, feedback))
            .run(&self.ctx, "Generate a compelling sales pitch for this product.", None)
            .await;

        match output.text() {
            Some(text) => Artifact::new(text),
            None => placeholder_pitch(&spec.product.name),
        }
    }
}

/// Reviews pitches against [`PITCH_RUBRIC`] with the evaluator model
#[derive(Debug, Clone)]
pub struct PitchEvaluator {
    ctx: PatternContext,
}

impl PitchEvaluator {
    pub fn new(ctx: PatternContext) -> Self {
        Self { ctx }
    }

    fn system_prompt(spec: &PitchSpec) -> String {
        let rubric = PITCH_RUBRIC
            .iter()
            .enumerate()
            .map(|(i, (name, description))| format!("{}. {}: {}", i + 1, name, description))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a quality assurance specialist for KETL Mtn. Apparel, evaluating sales pitches.\n\n\
             PRODUCT INFORMATION:\n{}\n\n\
             BRAND VOICE GUIDELINES:\n{}\n\n\
             Evaluate whether the pitch meets our requirements for:\n{}\n\n\
             Return a JSON object with this structure:\n\
             {{\n  \"status\": \"PASS\" or \"NEEDS_IMPROVEMENT\",\n  \
             \"feedback\": \"Detailed feedback explaining issues and suggesting improvements\",\n  \
             \"criteria\": [{{\"name\": \"Brand Voice\", \"passed\": true, \"feedback\": \"...\"}}]\n}}\n\n\
             Include one criteria entry per requirement. Only return \"PASS\" if the pitch meets ALL the criteria.",
            spec.product_json(),
            spec.style_guide,
            rubric
        )
    }
}

#[async_trait]
impl Evaluator<PitchSpec> for PitchEvaluator {
    async fn evaluate(&self, artifact: &Artifact, spec: &PitchSpec) -> VerdictParse {
        let output = PromptStep::new("evaluate_pitch", &self.ctx.models().evaluator)
            .system_prompt(Self::system_prompt(spec))
            .run(
                &self.ctx,
                &format!("Please evaluate this sales pitch:\n\n{}", artifact),
                None,
            )
            .await;

        let verdict = match (output.text(), output.failure()) {
            (Some(reply), _) => parse_verdict(reply),
            (None, Some(StepFailure::CallFailed(reason))) => VerdictParse::unavailable(Some(reason.as_str())),
            (None, _) => VerdictParse::unavailable(None),
        };
        debug!(
            product = %spec.product.name,
            status = %verdict.verdict().status,
            fallback = verdict.is_fallback(),
            "pitch evaluated"
        );
        verdict
    }
}

/// Write a pitch for `product_id` and refine it until it passes review or
/// the configured iteration budget runs out.
///
/// # Errors
///
/// `InvalidConfig` when the configured budget is zero.
pub async fn refine_pitch(ctx: &PatternContext, product_id: u32) -> WorkflowResult<RefinementOutcome> {
    let spec = PitchSpec::for_product(ctx, product_id);
    info!(product_id, product = %spec.product.name, "refining sales pitch");

    let refinement = RefinementLoop::builder(PitchGenerator::new(ctx.clone()), PitchEvaluator::new(ctx.clone()))
        .name("evaluator_optimizer")
        .max_iterations(ctx.refinement().max_iterations)
        .sink(ctx.sink().clone())
        .build()?;

    Ok(refinement
        .run_with_attributes(&spec, &[kv("product_id", product_id)])
        .await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComposerError;
    use crate::fixtures::InMemoryFixtureStore;
    use crate::telemetry::AttributeValue;
    use crate::workflow::evaluator_optimizer::RefinementStatus;
    use crate::workflow::execution::WorkflowError;
    use crate::workflow::test_support::{context_with, system_prompt, ScriptedProvider};
    use std::sync::Arc;

    fn fixtures() -> InMemoryFixtureStore {
        InMemoryFixtureStore::builder()
            .product(ProductRecord::new(5, "Vent Hoodie").with_features("Packable"))
            .style_guide("Friendly, outdoorsy, never salesy.")
            .build()
    }

    #[tokio::test]
    async fn test_generator_placeholder_on_failure() {
        let provider = Arc::new(ScriptedProvider::sequence(vec![
            Err(ComposerError::Llm("down".into())),
            Ok("  ".into()),
        ]));
        let (ctx, _sink) = context_with(provider, fixtures());
        let spec = PitchSpec::for_product(&ctx, 5);
        let generator = PitchGenerator::new(ctx);

        assert_eq!(
            generator.generate(&spec, None).await.as_str(),
            "[Placeholder pitch for Vent Hoodie]"
        );
        assert_eq!(
            generator.generate(&spec, Some("shorter")).await,
            placeholder_pitch("Vent Hoodie")
        );
    }

    #[tokio::test]
    async fn test_generator_prompt_includes_product_and_feedback() {
        let provider = Arc::new(ScriptedProvider::sequence(vec![Ok("A pitch.".into())]));
        let (ctx, _sink) = context_with(provider.clone(), fixtures());
        let spec = PitchSpec::for_product(&ctx, 5);

        PitchGenerator::new(ctx).generate(&spec, Some("Mention the guarantee")).await;

        let calls = provider.calls();
        let call = &calls[0];
        let system = system_prompt(call);
        assert!(system.contains("Vent Hoodie"));
        assert!(system.contains("Friendly, outdoorsy, never salesy."));
        assert!(system.contains("FEEDBACK FROM PREVIOUS EVALUATION:\nMention the guarantee"));
        assert_eq!(call.model.as_deref(), Some("llama-3.3-70b-versatile"));
    }

    #[tokio::test]
    async fn test_evaluator_failure_is_fallback() {
        let provider = Arc::new(ScriptedProvider::sequence(vec![Err(ComposerError::Llm(
            "timeout".into(),
        ))]));
        let (ctx, _sink) = context_with(provider.clone(), fixtures());
        let spec = PitchSpec::for_product(&ctx, 5);

        let verdict = PitchEvaluator::new(ctx).evaluate(&Artifact::new("pitch"), &spec).await;
        assert!(verdict.is_fallback());
        assert!(!verdict.is_pass());
        assert!(system_prompt(&provider.calls()[0]).contains("6. Conciseness"));
    }

    #[tokio::test]
    async fn test_refine_pitch_passes_on_second_round() {
        let provider = Arc::new(ScriptedProvider::sequence(vec![
            Ok("Draft one.".into()),
            Ok(r#"{"status": "NEEDS_IMPROVEMENT", "feedback": "Mention free returns"}"#.into()),
            Ok("Draft two with free returns.".into()),
            Ok(r#"{"status": "PASS", "feedback": "Great"}"#.into()),
        ]));
        let (ctx, sink) = context_with(provider, fixtures());

        let outcome = refine_pitch(&ctx, 5).await.unwrap();
        assert_eq!(outcome.status, RefinementStatus::Passed);
        assert_eq!(outcome.artifact.as_str(), "Draft two with free returns.");
        assert_eq!(outcome.history.len(), 2);

        let root = &sink.named("evaluator_optimizer")[0];
        assert_eq!(root.attribute("product_id"), Some(&AttributeValue::Int(5)));
        assert_eq!(root.attribute("iterations_needed"), Some(&AttributeValue::Int(2)));
        assert_eq!(root.attribute("total_iterations"), Some(&AttributeValue::Int(2)));
        assert_eq!(sink.named("generate_pitch").len(), 2);
        assert_eq!(sink.named("evaluate_pitch").len(), 2);
    }

    #[tokio::test]
    async fn test_refine_pitch_rejects_zero_budget() {
        let provider = Arc::new(ScriptedProvider::sequence(vec![]));
        let ctx = PatternContext::builder(provider.clone())
            .fixtures(Arc::new(fixtures()))
            .max_iterations(0)
            .build();

        assert!(matches!(
            refine_pitch(&ctx, 5).await,
            Err(WorkflowError::InvalidConfig(_))
        ));
        assert_eq!(provider.call_count(), 0);
    }
}
