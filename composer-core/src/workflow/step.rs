//! A single traced model call

use std::time::Instant;
use tracing::{debug, warn};

use crate::context::PatternContext;
use crate::llm::Message;
use crate::telemetry::{kv, SpanScope};

use super::execution::{StepTrace, WorkflowError, WorkflowResult};

/// Why a step produced no text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// The call succeeded but the reply was blank
    EmptyReply,
    /// The provider returned an error
    CallFailed(String),
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepFailure::EmptyReply => f.write_str("empty reply"),
            StepFailure::CallFailed(message) => f.write_str(message),
        }
    }
}

/// Output from a prompt step. Never an error: failures are carried as data
/// so every caller picks its own fallback.
#[derive(Debug, Clone)]
pub struct StepOutput {
    text: Option<String>,
    failure: Option<StepFailure>,
    trace: StepTrace,
}

impl StepOutput {
    /// Trimmed reply text, `None` when the call failed or came back blank
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        self.failure.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.text.is_some()
    }

    pub fn trace(&self) -> &StepTrace {
        &self.trace
    }

    pub fn into_trace(self) -> StepTrace {
        self.trace
    }

    /// Reply text or `fallback`
    pub fn text_or(&self, fallback: impl Into<String>) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => fallback.into(),
        }
    }

    /// Reply text, or an error describing why there is none
    pub fn require(&self) -> WorkflowResult<&str> {
        match (&self.text, &self.failure) {
            (Some(text), _) => Ok(text),
            (None, Some(StepFailure::CallFailed(message))) => {
                Err(WorkflowError::LLMError(message.clone()))
            }
            (None, _) => Err(WorkflowError::StepFailed {
                step: self.trace.step_name.clone(),
                message: StepFailure::EmptyReply.to_string(),
            }),
        }
    }
}

/// A named model call: fixed model and system prompt, user prompt per run.
#[derive(Debug, Clone)]
pub struct PromptStep {
    name: String,
    model: String,
    system_prompt: String,
}

impl PromptStep {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            system_prompt: String::new(),
        }
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run the step inside a span named after it.
    ///
    /// The span carries `step`, `model`, `success` and either
    /// `result_length` or `error`.
    pub async fn run(
        &self,
        ctx: &PatternContext,
        user_prompt: &str,
        history: Option<&[Message]>,
    ) -> StepOutput {
        let span = SpanScope::enter(
            ctx.sink(),
            &self.name,
            &[kv("step", self.name.as_str()), kv("model", self.model.as_str())],
        );
        debug!(step = %self.name, model = %self.model, "running prompt step");

        let started = Instant::now();
        let result = ctx
            .provider()
            .complete(&self.system_prompt, user_prompt, &self.model, history)
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let failure = match result {
            Ok(reply) if !reply.trim().is_empty() => {
                let text = reply.trim().to_string();
                span.record("success", true);
                span.record("result_length", text.len());
                return StepOutput {
                    text: Some(text),
                    failure: None,
                    trace: StepTrace::success(&self.name, &self.model, duration_ms),
                };
            }
            Ok(_) => {
                warn!(step = %self.name, model = %self.model, "model returned an empty reply");
                StepFailure::EmptyReply
            }
            Err(e) => {
                warn!(step = %self.name, model = %self.model, error = %e, "model call failed");
                StepFailure::CallFailed(e.to_string())
            }
        };

        span.record("success", false);
        span.record("error", failure.to_string());
        StepOutput {
            text: None,
            trace: StepTrace::failure(&self.name, &self.model, failure.to_string(), duration_ms),
            failure: Some(failure),
        }
    }
}
