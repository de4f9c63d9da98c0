//! Task planning for the orchestrator

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::PatternContext;
use crate::parsing::extract_json_block;

use super::execution::StepTrace;
use super::step::PromptStep;

pub const PROFILE_ANALYSIS: &str = "profile_analysis";
pub const PRODUCT_MATCHING: &str = "product_matching";

const PLANNER_PROMPT: &str = r#"You are a task planning expert. Analyze the customer query and break it down into
specialized tasks for product recommendations. Focus on understanding customer needs,
matching products and suggesting alternatives.

Return a JSON array of tasks, each with:
- task_type: "profile_analysis" for the customer profile, "product_matching" for product matching
- description: detailed description of the task
- required_inputs: list of required input data
- expected_output: description of the expected output format

Example response format:
[
  {
    "task_type": "profile_analysis",
    "description": "Analyze customer needs and preferences",
    "required_inputs": ["query"],
    "expected_output": "Customer profile JSON"
  },
  {
    "task_type": "product_matching",
    "description": "Find products matching customer profile",
    "required_inputs": ["profile", "products"],
    "expected_output": "Matched products JSON"
  }
]"#;

/// One unit of work handed to a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub task_type: String,
    pub description: String,
    pub required_inputs: Vec<String>,
    pub expected_output: String,
}

impl TaskDefinition {
    pub fn new(
        task_type: impl Into<String>,
        description: impl Into<String>,
        required_inputs: &[&str],
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            task_type: task_type.into(),
            description: description.into(),
            required_inputs: required_inputs.iter().map(|s| s.to_string()).collect(),
            expected_output: expected_output.into(),
        }
    }
}

/// Plan used whenever the planner reply is missing or unreadable
pub fn default_tasks() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition::new(
            PROFILE_ANALYSIS,
            "Analyze customer profile and needs",
            &["query"],
            "Customer profile JSON",
        ),
        TaskDefinition::new(
            PRODUCT_MATCHING,
            "Match products to customer profile",
            &["profile", "products"],
            "Matched products JSON",
        ),
    ]
}

/// Parse a planner reply, fenced or bare. `None` for anything that is not
/// a non-empty array of complete task definitions.
pub fn parse_plan(reply: &str) -> Option<Vec<TaskDefinition>> {
    match serde_json::from_str::<Vec<TaskDefinition>>(extract_json_block(reply)) {
        Ok(tasks) if !tasks.is_empty() => Some(tasks),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "planner reply is not a task list");
            None
        }
    }
}

/// Breaks a recommendation request into worker tasks
#[derive(Debug, Clone)]
pub struct TaskPlanner {
    ctx: PatternContext,
}

impl TaskPlanner {
    pub fn new(ctx: PatternContext) -> Self {
        Self { ctx }
    }

    pub async fn plan(&self, query: &str) -> (Vec<TaskDefinition>, StepTrace) {
        let output = PromptStep::new("plan_tasks", &self.ctx.models().planner)
            .system_prompt(PLANNER_PROMPT)
            .run(&self.ctx, query, None)
            .await;

        let tasks = match output.text().and_then(parse_plan) {
            Some(tasks) => tasks,
            None => {
                warn!("planner produced no usable plan, using default tasks");
                default_tasks()
            }
        };

        (tasks, output.into_trace())
    }
}
