//! Workflow execution types and error handling

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for workflow operations
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Step produced no usable output
    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    /// LLM provider error
    #[error("LLM error: {0}")]
    LLMError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Trace of a single model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTrace {
    /// Step name
    pub step_name: String,

    /// Model the step called
    pub model: String,

    /// Wall-clock duration of the call
    pub duration_ms: u64,

    /// Whether the step produced non-empty text
    pub success: bool,

    /// Error message if failed
    pub error: Option<String>,
}

impl StepTrace {
    pub fn success(step_name: impl Into<String>, model: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            step_name: step_name.into(),
            model: model.into(),
            duration_ms,
            success: true,
            error: None,
        }
    }

    pub fn failure(
        step_name: impl Into<String>,
        model: impl Into<String>,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            model: model.into(),
            duration_ms,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Ordered step traces for one pattern run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionTrace {
    /// Pattern name
    pub workflow_name: String,

    /// Step traces in execution order
    pub steps: Vec<StepTrace>,

    /// Sum of step durations
    pub total_duration_ms: u64,
}

impl ExecutionTrace {
    pub fn new(workflow_name: impl Into<String>) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            ..Self::default()
        }
    }

    pub fn add_step(&mut self, step: StepTrace) {
        self.total_duration_ms += step.duration_ms;
        self.steps.push(step);
    }

    /// True when every step produced output
    pub fn all_succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.success)
    }

    /// Names of steps that degraded to a fallback
    pub fn degraded_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| !s.success)
            .map(|s| s.step_name.as_str())
            .collect()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step_name.as_str()).collect()
    }
}
