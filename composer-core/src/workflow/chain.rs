//! Prompt chaining
//!
//! A customer-service chain of three model calls where each step gates or
//! feeds the next: validate the query, look the answer up in the catalog,
//! then rewrite it in the brand voice.

use tracing::{info, warn};

use crate::context::PatternContext;
use crate::llm::Message;
use crate::telemetry::{kv, SpanScope};

use super::execution::ExecutionTrace;
use super::step::PromptStep;
use super::voice::format_in_brand_voice;

/// Prefix of every refusal
pub const REFUSAL_PREFIX: &str =
    "I'm sorry, but I can only assist with questions related to KETL Mtn. Apparel products and services.";

/// Answer used when the catalog lookup produced nothing
pub const LOOKUP_UNAVAILABLE: &str =
    "I'm sorry, I couldn't look that up right now. Please try again in a moment.";

const VALID_EXPLANATION: &str = "Query is related to outdoor apparel or activities.";
const INVALID_EXPLANATION: &str =
    "Query does not appear to be related to KETL Mtn. products or outdoor activities.";

const VALIDATOR_PROMPT: &str = "You are a query validator for KETL Mtn. Apparel, an outdoor gear \
company specializing in lightweight, packable, breathable and durable products for adventure and travel.

Decide whether a customer query is related to KETL Mtn. products, services, outdoor activities or \
general information about the company.

ONLY respond with one of these options:
- \"valid\" if the query is related to KETL Mtn. products, outdoor activities, or is otherwise appropriate
- \"invalid\" if the query is inappropriate or completely unrelated to outdoor gear

Be permissive: if the query could reasonably be about outdoor activities or apparel, it is valid.";

const LOOKUP_PROMPT: &str = "You are a product information specialist for KETL Mtn. Apparel. \
Given a customer query and the product database, give a detailed and accurate answer based on the \
product information available. Mention relevant product details, features, materials and pricing. \
If the customer refers to earlier messages in the conversation, use that context.";

/// Result of one pass through the chain
#[derive(Debug, Clone)]
pub struct ChainResponse {
    /// Text returned to the customer
    pub answer: String,
    /// Whether the query passed validation
    pub accepted: bool,
    pub trace: ExecutionTrace,
}

/// `true` iff the reply says "valid" without saying "invalid"
pub fn is_valid_reply(reply: &str) -> bool {
    let reply = reply.trim().to_lowercase();
    reply.contains("valid") && !reply.contains("invalid")
}

/// Validate → lookup → brand voice
#[derive(Debug, Clone)]
pub struct CustomerServiceChain {
    ctx: PatternContext,
}

impl CustomerServiceChain {
    pub fn new(ctx: PatternContext) -> Self {
        Self { ctx }
    }

    /// Answer `query`, appending the user and assistant turns to `history`.
    pub async fn process(&self, query: &str, history: &mut Vec<Message>) -> ChainResponse {
        let root = SpanScope::enter(
            self.ctx.sink(),
            "prompt_chaining",
            &[kv("user_query", query), kv("pattern", "prompt_chaining")],
        );
        let mut trace = ExecutionTrace::new("prompt_chaining");

        let (accepted, explanation) = self.validate(query, &mut trace).await;
        root.record("accepted", accepted);

        let answer = if !accepted {
            info!("query rejected by validator");
            format!("{} {}", REFUSAL_PREFIX, explanation)
        } else {
            self.answer(query, history, &mut trace).await
        };

        history.push(Message::user(query));
        history.push(Message::assistant(answer.clone()));

        root.record("steps_completed", trace.steps.len());
        ChainResponse {
            answer,
            accepted,
            trace,
        }
    }

    async fn validate(&self, query: &str, trace: &mut ExecutionTrace) -> (bool, &'static str) {
        let step = PromptStep::new("validate_query", &self.ctx.models().validator)
            .system_prompt(VALIDATOR_PROMPT);
        let user_prompt = format!(
            "Is this query appropriate and related to KETL Mtn. Apparel or outdoor activities? '{}'",
            query
        );

        let output = step.run(&self.ctx, &user_prompt, None).await;
        // A validator that never answered cannot vouch for the query.
        let valid = output.text().is_some_and(is_valid_reply);
        trace.add_step(output.into_trace());

        if valid {
            (true, VALID_EXPLANATION)
        } else {
            (false, INVALID_EXPLANATION)
        }
    }

    async fn answer(&self, query: &str, history: &[Message], trace: &mut ExecutionTrace) -> String {
        let catalog = serde_json::to_string_pretty(&self.ctx.fixtures().products())
            .unwrap_or_else(|_| "[]".to_string());
        let user_prompt = format!(
            "Customer query: '{}'\n\nProduct database:\n{}\n\n\
             Based on this information, provide a detailed answer to the customer's query. \
             Reference the product catalog to ensure accuracy.",
            query, catalog
        );

        let lookup = PromptStep::new("lookup_product_info", &self.ctx.models().lookup)
            .system_prompt(LOOKUP_PROMPT)
            .run(&self.ctx, &user_prompt, Some(history))
            .await;
        let raw = lookup.text().map(str::to_string);
        trace.add_step(lookup.into_trace());

        let Some(raw) = raw else {
            warn!("catalog lookup failed, skipping brand voice rewrite");
            return LOOKUP_UNAVAILABLE.to_string();
        };

        let formatted = format_in_brand_voice(&self.ctx, &raw).await;
        let answer = formatted.text_or(raw);
        if !formatted.is_success() {
            warn!("brand voice rewrite failed, returning unformatted answer");
        }
        trace.add_step(formatted.into_trace());
        answer
    }
}
