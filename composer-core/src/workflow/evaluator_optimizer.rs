//! Evaluator-Optimizer Workflow Pattern
//!
//! Bounded generate → evaluate → refine loop.
//!
//! The loop is a small state machine:
//!
//! ```text
//! Generating ──► Evaluating ──┬──► Passed
//!      ▲                      ├──► Exhausted
//!      └──── Continuing ◄─────┘
//! ```
//!
//! Each evaluation decides the next state with [`next_state`]: a passing
//! verdict always ends the loop as [`RefinementStatus::Passed`], even on
//! the final iteration; otherwise the loop stops as
//! [`RefinementStatus::Exhausted`] once `max_iterations` evaluations have
//! run, or continues with the verdict's feedback threaded into the next
//! generation.
//!
//! Generation and evaluation never fail from the loop's point of view:
//! generators degrade to placeholder artifacts and evaluators to
//! [`VerdictParse::Fallback`] verdicts, which never pass.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::telemetry::{kv, KeyValue, SpanScope, TraceSink};

use super::execution::{WorkflowError, WorkflowResult};
use super::verdict::VerdictParse;

/// Immutable text produced by a generator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact(String);

impl Artifact {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Artifact {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Artifact {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

/// Produces a candidate artifact from a specification.
#[async_trait]
pub trait Generator<S: ?Sized + Sync>: Send + Sync {
    /// Generate an artifact, revising against `feedback` when present.
    ///
    /// Must not fail; degrade to a placeholder artifact instead.
    async fn generate(&self, spec: &S, feedback: Option<&str>) -> Artifact;
}

/// Judges an artifact against a specification.
#[async_trait]
pub trait Evaluator<S: ?Sized + Sync>: Send + Sync {
    /// Evaluate `artifact`. Unusable evaluator output must come back as
    /// [`VerdictParse::Fallback`].
    async fn evaluate(&self, artifact: &Artifact, spec: &S) -> VerdictParse;
}

/// One generation and, once evaluated, its verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub artifact: Artifact,
    pub verdict: Option<VerdictParse>,
}

impl IterationRecord {
    pub fn new(artifact: Artifact) -> Self {
        Self {
            artifact,
            verdict: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict.as_ref().is_some_and(VerdictParse::is_pass)
    }
}

/// Loop state; `iteration` is 1-based
#[derive(Debug, Clone, PartialEq)]
pub enum RefinementState {
    Generating {
        iteration: usize,
        feedback: Option<String>,
    },
    Evaluating {
        iteration: usize,
        artifact: Artifact,
    },
    Continuing {
        iteration: usize,
        feedback: String,
    },
    Passed {
        iteration: usize,
    },
    Exhausted {
        iteration: usize,
    },
}

/// State after evaluating iteration `iteration` of `max_iterations`.
///
/// PASS wins over exhaustion.
pub fn next_state(iteration: usize, max_iterations: usize, verdict: &VerdictParse) -> RefinementState {
    if verdict.is_pass() {
        RefinementState::Passed { iteration }
    } else if iteration >= max_iterations {
        RefinementState::Exhausted { iteration }
    } else {
        RefinementState::Continuing {
            iteration,
            feedback: revision_notes(verdict),
        }
    }
}

/// Feedback handed to the next generation: the overall feedback followed
/// by one line per failing criterion.
fn revision_notes(verdict: &VerdictParse) -> String {
    let verdict = verdict.verdict();
    let mut notes = verdict.feedback.clone();
    for criterion in verdict.criteria.iter().filter(|c| !c.passed) {
        if !notes.is_empty() {
            notes.push('\n');
        }
        notes.push_str(&format!("- {}: {}", criterion.name, criterion.feedback));
    }
    notes
}

/// How a loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementStatus {
    Passed,
    Exhausted,
}

/// Final artifact plus everything that led to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementOutcome {
    pub status: RefinementStatus,
    /// Most recent artifact
    pub artifact: Artifact,
    /// One record per generation, in order
    pub history: Vec<IterationRecord>,
    /// Evaluator calls made
    pub evaluations: usize,
}

impl RefinementOutcome {
    pub fn passed(&self) -> bool {
        self.status == RefinementStatus::Passed
    }

    /// Generator calls made
    pub fn generations(&self) -> usize {
        self.history.len()
    }

    /// Verdict on the final artifact
    pub fn final_verdict(&self) -> Option<&VerdictParse> {
        self.history.last().and_then(|r| r.verdict.as_ref())
    }
}

/// Configuration for the refinement loop
#[derive(Debug, Clone)]
pub struct RefinementConfig {
    /// Maximum generate/evaluate rounds, at least 1
    pub max_iterations: usize,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self { max_iterations: 3 }
    }
}

/// Evaluator-optimizer loop over a generator and an evaluator
pub struct RefinementLoop<G, E> {
    name: String,
    generator: G,
    evaluator: E,
    config: RefinementConfig,
    sink: Option<Arc<dyn TraceSink>>,
}

impl<G, E> fmt::Debug for RefinementLoop<G, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefinementLoop")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("traced", &self.sink.is_some())
            .finish()
    }
}

impl<G, E> RefinementLoop<G, E> {
    pub fn builder(generator: G, evaluator: E) -> RefinementLoopBuilder<G, E> {
        RefinementLoopBuilder::new(generator, evaluator)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_iterations(&self) -> usize {
        self.config.max_iterations
    }

    /// Run the loop for `spec`.
    pub async fn run<S>(&self, spec: &S) -> RefinementOutcome
    where
        S: ?Sized + Sync,
        G: Generator<S>,
        E: Evaluator<S>,
    {
        self.run_with_attributes(spec, &[]).await
    }

    /// Run the loop inside a root span carrying `attributes`.
    ///
    /// The span also records `iterations_needed` when the loop passes and
    /// `total_iterations` when it ends.
    pub async fn run_with_attributes<S>(&self, spec: &S, attributes: &[KeyValue]) -> RefinementOutcome
    where
        S: ?Sized + Sync,
        G: Generator<S>,
        E: Evaluator<S>,
    {
        let root = self.sink.as_ref().map(|sink| {
            let mut attrs = vec![kv("pattern", self.name.as_str())];
            attrs.extend_from_slice(attributes);
            SpanScope::enter(sink, &self.name, &attrs)
        });

        let max = self.config.max_iterations;
        let mut history: Vec<IterationRecord> = Vec::new();
        let mut evaluations = 0;
        let mut state = RefinementState::Generating {
            iteration: 1,
            feedback: None,
        };

        let status = loop {
            state = match state {
                RefinementState::Generating {
                    iteration,
                    feedback,
                } => {
                    debug!(
                        loop_name = %self.name,
                        iteration,
                        revising = feedback.is_some(),
                        "generating"
                    );
                    let artifact = self.generator.generate(spec, feedback.as_deref()).await;
                    history.push(IterationRecord::new(artifact.clone()));
                    RefinementState::Evaluating {
                        iteration,
                        artifact,
                    }
                }
                RefinementState::Evaluating {
                    iteration,
                    artifact,
                } => {
                    let verdict = self.evaluator.evaluate(&artifact, spec).await;
                    evaluations += 1;
                    if verdict.is_fallback() {
                        warn!(loop_name = %self.name, iteration, "evaluation fell back to NEEDS_IMPROVEMENT");
                    }
                    let next = next_state(iteration, max, &verdict);
                    if let Some(record) = history.last_mut() {
                        record.verdict = Some(verdict);
                    }
                    next
                }
                RefinementState::Continuing {
                    iteration,
                    feedback,
                } => {
                    info!(
                        loop_name = %self.name,
                        iteration,
                        max_iterations = max,
                        "needs improvement, refining"
                    );
                    RefinementState::Generating {
                        iteration: iteration + 1,
                        feedback: Some(feedback),
                    }
                }
                RefinementState::Passed { iteration } => {
                    info!(loop_name = %self.name, iteration, "passed");
                    if let Some(root) = &root {
                        root.record("iterations_needed", iteration);
                    }
                    break RefinementStatus::Passed;
                }
                RefinementState::Exhausted { iteration } => {
                    warn!(loop_name = %self.name, iteration, "iteration budget exhausted without a pass");
                    break RefinementStatus::Exhausted;
                }
            };
        };

        if let Some(root) = root {
            root.end(&[
                kv("total_iterations", history.len()),
                kv("passed", status == RefinementStatus::Passed),
            ]);
        }

        let artifact = history
            .last()
            .map(|r| r.artifact.clone())
            .unwrap_or_else(|| Artifact::new(""));

        RefinementOutcome {
            status,
            artifact,
            history,
            evaluations,
        }
    }
}

/// Builder for [`RefinementLoop`]
pub struct RefinementLoopBuilder<G, E> {
    name: String,
    generator: G,
    evaluator: E,
    config: RefinementConfig,
    sink: Option<Arc<dyn TraceSink>>,
}

impl<G, E> RefinementLoopBuilder<G, E> {
    pub fn new(generator: G, evaluator: E) -> Self {
        Self {
            name: "evaluator_optimizer".to_string(),
            generator,
            evaluator,
            config: RefinementConfig::default(),
            sink: None,
        }
    }

    /// Root span name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// # Errors
    ///
    /// `InvalidConfig` when `max_iterations` is zero.
    pub fn build(self) -> WorkflowResult<RefinementLoop<G, E>> {
        if self.config.max_iterations == 0 {
            return Err(WorkflowError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        Ok(RefinementLoop {
            name: self.name,
            generator: self.generator,
            evaluator: self.evaluator,
            config: self.config,
            sink: self.sink,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{AttributeValue, RecordingSink};
    use crate::workflow::verdict::{CriterionResult, Verdict};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingGenerator {
        count: AtomicUsize,
        feedback: Mutex<Vec<Option<String>>>,
    }

    impl CountingGenerator {
        fn new() -> Self {
            Self {
                count: AtomicUsize::new(0),
                feedback: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator<str> for CountingGenerator {
        async fn generate(&self, spec: &str, feedback: Option<&str>) -> Artifact {
            let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
            self.feedback.lock().unwrap().push(feedback.map(str::to_string));
            Artifact::new(format!("{} draft {}", spec, n))
        }
    }

    struct ScriptedEvaluator {
        verdicts: Mutex<VecDeque<VerdictParse>>,
        calls: AtomicUsize,
    }

    impl ScriptedEvaluator {
        fn new(verdicts: Vec<VerdictParse>) -> Self {
            Self {
                verdicts: Mutex::new(verdicts.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Evaluator<str> for ScriptedEvaluator {
        async fn evaluate(&self, _artifact: &Artifact, _spec: &str) -> VerdictParse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdicts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| VerdictParse::Parsed(Verdict::needs_improvement("again")))
        }
    }

    fn pass() -> VerdictParse {
        VerdictParse::Parsed(Verdict::pass("ship it"))
    }

    fn needs_work(feedback: &str) -> VerdictParse {
        VerdictParse::Parsed(Verdict::needs_improvement(feedback))
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let result = RefinementLoop::builder(CountingGenerator::new(), ScriptedEvaluator::new(vec![]))
            .max_iterations(0)
            .build();
        assert!(matches!(result, Err(WorkflowError::InvalidConfig(_))));
    }

    #[test]
    fn test_next_state_pass_beats_exhaustion() {
        assert_eq!(next_state(3, 3, &pass()), RefinementState::Passed { iteration: 3 });
        assert_eq!(
            next_state(3, 3, &needs_work("no")),
            RefinementState::Exhausted { iteration: 3 }
        );
        assert_eq!(
            next_state(1, 3, &needs_work("shorter")),
            RefinementState::Continuing {
                iteration: 1,
                feedback: "shorter".to_string()
            }
        );
    }

    #[test]
    fn test_fallback_pass_status_does_not_pass() {
        let fallback = VerdictParse::Fallback(Verdict::pass("suspicious"));
        assert!(!fallback.is_pass());
        assert_eq!(next_state(1, 1, &fallback), RefinementState::Exhausted { iteration: 1 });
    }

    #[test]
    fn test_revision_notes_include_failing_criteria() {
        let verdict = VerdictParse::Parsed(
            Verdict::needs_improvement("Close")
                .with_criterion(CriterionResult::new("Brand Voice", true, "good"))
                .with_criterion(CriterionResult::new("Conciseness", false, "too long")),
        );
        let RefinementState::Continuing { feedback, .. } = next_state(1, 2, &verdict) else {
            panic!("expected to continue");
        };
        assert_eq!(feedback, "Close\n- Conciseness: too long");
    }

    #[tokio::test]
    async fn test_first_pass_stops_immediately() {
        let refinement = RefinementLoop::builder(CountingGenerator::new(), ScriptedEvaluator::new(vec![pass()]))
            .max_iterations(5)
            .build()
            .unwrap();

        let outcome = refinement.run("pitch").await;
        assert!(outcome.passed());
        assert_eq!(outcome.generations(), 1);
        assert_eq!(outcome.evaluations, 1);
        assert_eq!(outcome.artifact.as_str(), "pitch draft 1");
    }

    #[tokio::test]
    async fn test_pass_on_third_iteration() {
        let generator = CountingGenerator::new();
        let evaluator = ScriptedEvaluator::new(vec![needs_work("more features"), needs_work("shorter"), pass()]);
        let refinement = RefinementLoop::builder(generator, evaluator)
            .max_iterations(3)
            .build()
            .unwrap();

        let outcome = refinement.run("pitch").await;
        assert_eq!(outcome.status, RefinementStatus::Passed);
        assert_eq!(outcome.generations(), 3);
        assert_eq!(outcome.evaluations, 3);
        assert_eq!(outcome.artifact.as_str(), "pitch draft 3");
        assert!(outcome.history.iter().all(|r| r.verdict.is_some()));
        assert!(outcome.history[2].passed());

        let feedback = refinement.generator.feedback.lock().unwrap().clone();
        assert_eq!(
            feedback,
            vec![None, Some("more features".to_string()), Some("shorter".to_string())]
        );
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_artifact() {
        for max in 1..=4 {
            let refinement = RefinementLoop::builder(CountingGenerator::new(), ScriptedEvaluator::new(vec![]))
                .max_iterations(max)
                .build()
                .unwrap();

            let outcome = refinement.run("pitch").await;
            assert_eq!(outcome.status, RefinementStatus::Exhausted);
            assert_eq!(outcome.generations(), max);
            assert_eq!(outcome.evaluations, max);
            assert_eq!(refinement.evaluator.calls.load(Ordering::SeqCst), max);
            assert_eq!(outcome.artifact.as_str(), format!("pitch draft {}", max));
        }
    }

    #[tokio::test]
    async fn test_root_span_attributes() {
        let recorder = Arc::new(RecordingSink::new());
        let refinement = RefinementLoop::builder(
            CountingGenerator::new(),
            ScriptedEvaluator::new(vec![needs_work("x"), pass()]),
        )
        .name("pitch_refinement")
        .sink(recorder.clone())
        .build()
        .unwrap();

        refinement
            .run_with_attributes("pitch", &[kv("product_id", 5)])
            .await;

        let span = &recorder.named("pitch_refinement")[0];
        assert!(span.is_closed());
        assert_eq!(span.attribute("product_id"), Some(&AttributeValue::Int(5)));
        assert_eq!(span.attribute("iterations_needed"), Some(&AttributeValue::Int(2)));
        assert_eq!(span.attribute("total_iterations"), Some(&AttributeValue::Int(2)));
    }
}
