//! Scripted provider shared by the workflow unit tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::context::PatternContext;
use crate::error::Result;
use crate::fixtures::InMemoryFixtureStore;
use crate::llm::{LLMProvider, LLMRequest, LLMResponse, MessageRole};
use crate::telemetry::RecordingSink;

type Responder = Box<dyn Fn(&LLMRequest) -> Result<String> + Send + Sync>;

pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String>>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<LLMRequest>>,
}

impl ScriptedProvider {
    /// Replies handed out in order; an empty reply once the script runs out
    pub(crate) fn sequence(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            responder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies computed from each request
    pub(crate) fn respond_with(
        f: impl Fn(&LLMRequest) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(f)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<LLMRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        self.calls.lock().unwrap().push(request.clone());

        let content = match &self.responder {
            Some(responder) => responder(request)?,
            None => self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))?,
        };

        Ok(LLMResponse {
            content,
            usage: None,
        })
    }
}

/// System prompt of a captured request, empty when there is none
pub(crate) fn system_prompt(request: &LLMRequest) -> &str {
    request
        .messages
        .iter()
        .find(|m| m.role == MessageRole::System)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

/// Final user prompt of a captured request
pub(crate) fn user_prompt(request: &LLMRequest) -> &str {
    request
        .messages
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

pub(crate) fn context(provider: Arc<ScriptedProvider>) -> (PatternContext, Arc<RecordingSink>) {
    context_with(provider, InMemoryFixtureStore::default())
}

pub(crate) fn context_with(
    provider: Arc<ScriptedProvider>,
    fixtures: InMemoryFixtureStore,
) -> (PatternContext, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let ctx = PatternContext::builder(provider)
        .fixtures(Arc::new(fixtures))
        .sink(sink.clone())
        .build();
    (ctx, sink)
}
