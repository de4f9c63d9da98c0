//! Orchestrator-workers
//!
//! A planner splits a recommendation request into tasks, specialised
//! workers handle the profile analysis and product matching, and a
//! synthesizer turns their structured results into a single answer.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::context::PatternContext;
use crate::parsing::extract_json_block;
use crate::telemetry::{kv, SpanScope};

use super::execution::ExecutionTrace;
use super::planner::{default_tasks, TaskDefinition, TaskPlanner, PRODUCT_MATCHING, PROFILE_ANALYSIS};
use super::step::PromptStep;

/// Returned when the synthesizer produced nothing
pub const NO_RECOMMENDATION: &str = "Sorry, I couldn't generate a recommendation at this time.";

/// Catalog products shown to the matching worker
pub const MATCHING_SAMPLE_SIZE: usize = 20;

const PROFILE_CONFIDENCE: f64 = 0.9;
const MATCHING_CONFIDENCE: f64 = 0.85;

const PROFILE_PROMPT: &str = r#"You are a customer needs analyst. Extract key information about the customer's:
- Activities and use cases
- Environmental conditions
- Performance requirements
- Style preferences

Return a JSON object with structured profile information.

Example response format:
{
  "activities": ["hiking", "trekking"],
  "environment": {"location": "Colorado", "season": "summer", "conditions": "hot, dry"},
  "requirements": ["lightweight", "breathable", "durable"],
  "style_preferences": ["functional", "minimalist"]
}"#;

const MATCHING_PROMPT: &str = r#"You are a product matching specialist. Find KETL Mtn. products that best match
the customer profile. Consider activity compatibility, environmental suitability,
performance requirements and style preferences.

Return a JSON object with ranked product matches and reasoning.

Example response format:
{
  "matches": [
    {"product_id": 12, "product_name": "Lightweight Hiking Pants", "match_score": 0.95,
     "reasoning": "Lightweight, breathable fabric for summer hiking"}
  ],
  "alternatives": [
    {"product_id": 8, "product_name": "All-Weather Hiking Jacket", "match_score": 0.75,
     "reasoning": "Covers unexpected weather changes in the mountains"}
  ]
}"#;

/// Output of one worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub task_type: String,
    /// Structured JSON the worker produced, or its fallback
    pub result: Value,
    pub confidence: f64,
}

/// Final orchestrator output
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub tasks: Vec<TaskDefinition>,
    pub worker_results: Vec<WorkerResult>,
    pub text: String,
    pub trace: ExecutionTrace,
}

/// Profile used when the profile worker reply is unusable
pub fn fallback_profile() -> Value {
    json!({
        "activities": ["hiking", "trekking"],
        "environment": {"location": "Colorado", "season": "summer"},
        "requirements": ["lightweight"]
    })
}

/// Matches used when the matching worker reply is unusable
pub fn fallback_matches() -> Value {
    json!({
        "matches": [{"product_id": 1, "product_name": "Example Product", "match_score": 0.8}],
        "alternatives": []
    })
}

/// Workers only accept a JSON object
fn parse_object(reply: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(extract_json_block(reply)) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn task_or_default(tasks: &[TaskDefinition], task_type: &str) -> TaskDefinition {
    tasks
        .iter()
        .find(|t| t.task_type == task_type)
        .cloned()
        .or_else(|| default_tasks().into_iter().find(|t| t.task_type == task_type))
        .unwrap_or_else(|| TaskDefinition::new(task_type, "", &[], ""))
}

/// Plan → profile → match → synthesize
#[derive(Debug, Clone)]
pub struct RecommendationOrchestrator {
    ctx: PatternContext,
    planner: TaskPlanner,
}

impl RecommendationOrchestrator {
    pub fn new(ctx: PatternContext) -> Self {
        Self {
            planner: TaskPlanner::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn recommend(&self, query: &str) -> Recommendation {
        let root = SpanScope::enter(
            self.ctx.sink(),
            "orchestrator_workers",
            &[kv("user_query", query), kv("pattern", "orchestrator_workers")],
        );
        let mut trace = ExecutionTrace::new("orchestrator_workers");

        let (tasks, step) = self.planner.plan(query).await;
        trace.add_step(step);
        root.record("task_count", tasks.len());
        info!(tasks = tasks.len(), "recommendation planned");

        let profile_task = task_or_default(&tasks, PROFILE_ANALYSIS);
        let profile = self.analyze_profile(query, &profile_task, &mut trace).await;

        let matching_task = task_or_default(&tasks, PRODUCT_MATCHING);
        let matches = self
            .match_products(&profile.result, &matching_task, &mut trace)
            .await;

        let worker_results = vec![profile, matches];
        let text = self.synthesize(query, &worker_results, &mut trace).await;

        root.record("degraded_steps", trace.degraded_steps().len());
        Recommendation {
            tasks,
            worker_results,
            text,
            trace,
        }
    }

    async fn analyze_profile(
        &self,
        query: &str,
        task: &TaskDefinition,
        trace: &mut ExecutionTrace,
    ) -> WorkerResult {
        let output = PromptStep::new("analyze_customer_profile", &self.ctx.models().worker)
            .system_prompt(format!("{}\n\nTask: {}", PROFILE_PROMPT, task.description))
            .run(&self.ctx, query, None)
            .await;

        let result = output.text().and_then(parse_object).unwrap_or_else(|| {
            warn!("profile analysis unusable, using fallback profile");
            fallback_profile()
        });
        trace.add_step(output.into_trace());

        WorkerResult {
            task_type: PROFILE_ANALYSIS.to_string(),
            result,
            confidence: PROFILE_CONFIDENCE,
        }
    }

    async fn match_products(
        &self,
        profile: &Value,
        task: &TaskDefinition,
        trace: &mut ExecutionTrace,
    ) -> WorkerResult {
        let sample: Vec<_> = self
            .ctx
            .fixtures()
            .products()
            .into_iter()
            .take(MATCHING_SAMPLE_SIZE)
            .collect();
        let user_prompt = json!({ "profile": profile, "products": sample }).to_string();

        let output = PromptStep::new("match_products", &self.ctx.models().worker)
            .system_prompt(format!("{}\n\nTask: {}", MATCHING_PROMPT, task.description))
            .run(&self.ctx, &user_prompt, None)
            .await;

        let result = output.text().and_then(parse_object).unwrap_or_else(|| {
            warn!("product matching unusable, using fallback matches");
            fallback_matches()
        });
        trace.add_step(output.into_trace());

        WorkerResult {
            task_type: PRODUCT_MATCHING.to_string(),
            result,
            confidence: MATCHING_CONFIDENCE,
        }
    }

    async fn synthesize(
        &self,
        query: &str,
        results: &[WorkerResult],
        trace: &mut ExecutionTrace,
    ) -> String {
        let system_prompt = format!(
            "You are KETL Mtn.'s product recommendation specialist. Create a personalized \
             recommendation using the analysis results. Follow our brand voice guidelines:\n\n{}",
            self.ctx.fixtures().style_guide()
        );
        let user_prompt = json!({
            "query": query,
            "results": results.iter().map(|r| &r.result).collect::<Vec<_>>(),
        })
        .to_string();

        let output = PromptStep::new("synthesize_recommendation", &self.ctx.models().synthesizer)
            .system_prompt(system_prompt)
            .run(&self.ctx, &user_prompt, None)
            .await;

        let text = output.text_or(NO_RECOMMENDATION);
        trace.add_step(output.into_trace());
        text
    }
}
