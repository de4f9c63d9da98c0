//! Routing
//!
//! Classify a customer query, dispatch it to the specialist handler for
//! its category and rewrite whatever comes back in the brand voice.

use tracing::{info, warn};

use crate::context::PatternContext;
use crate::llm::Message;
use crate::telemetry::{kv, SpanScope};

use super::classifier::{Classification, QueryClassifier, QueryType};
use super::execution::ExecutionTrace;
use super::step::PromptStep;
use super::voice::format_in_brand_voice;

/// Appended to the classifier explanation for unclear queries
pub const CLARIFICATION_REQUEST: &str = "Could you please clarify if you're asking about our products, our company, or our warranty/repair process?";

/// Handler answer used when the specialist call produced nothing
pub const HANDLER_UNAVAILABLE: &str =
    "I'm sorry, I couldn't find an answer to that right now. Please try again in a moment.";

const PRODUCT_HANDLER_PROMPT: &str = "You are a product specialist for KETL Mtn. Apparel. \
Given a customer query and the product database, give a detailed and accurate answer based on the \
product information available. Mention relevant product details, features, materials and pricing. \
If the customer refers to earlier messages in the conversation, use that context.";

const COMPANY_HANDLER_PROMPT: &str = "You are a company representative for KETL Mtn. Apparel. \
Given a customer query about the company and the company information, give an accurate answer based \
on the available information, focusing on the company's values, mission and sustainability work. \
If the customer refers to earlier messages in the conversation, use that context.";

const WARRANTY_HANDLER_PROMPT: &str = "You are a customer service representative for KETL Mtn. \
Apparel. Given a customer query about warranties, guarantees, repairs or returns, give an accurate \
answer based on the available warranty information, focusing on the lifetime guarantee and the repair \
process. If the customer refers to earlier messages in the conversation, use that context.";

/// Result of routing one query
#[derive(Debug, Clone)]
pub struct RoutedResponse {
    pub classification: Classification,
    /// Brand-voice answer returned to the customer
    pub answer: String,
    pub trace: ExecutionTrace,
}

/// Classify → handle → format
#[derive(Debug, Clone)]
pub struct QueryRouter {
    ctx: PatternContext,
    classifier: QueryClassifier,
}

impl QueryRouter {
    pub fn new(ctx: PatternContext) -> Self {
        Self {
            classifier: QueryClassifier::new(ctx.clone()),
            ctx,
        }
    }

    /// Route `query`, appending the user and assistant turns to `history`.
    pub async fn route(&self, query: &str, history: &mut Vec<Message>) -> RoutedResponse {
        let root = SpanScope::enter(
            self.ctx.sink(),
            "routing_pattern",
            &[kv("user_query", query), kv("pattern", "routing")],
        );
        let mut trace = ExecutionTrace::new("routing");

        let classification = {
            let span = SpanScope::enter(self.ctx.sink(), "classify_query", &[kv("step", "classify_query")]);
            let (classification, step) = self.classifier.classify(query).await;
            trace.add_step(step);
            span.record("query_type", classification.query_type.as_str());
            span.record("confidence", classification.confidence);
            span.record("explanation", classification.explanation.as_str());
            classification
        };
        info!(
            query_type = %classification.query_type,
            confidence = classification.confidence,
            "query classified"
        );

        let raw = {
            let span = SpanScope::enter(
                self.ctx.sink(),
                "handle_query",
                &[kv("step", "handle_query"), kv("handler", classification.query_type.as_str())],
            );
            let raw = self.handle(query, &classification, history, &mut trace).await;
            span.record("response_length", raw.len());
            raw
        };

        let answer = {
            let formatted = format_in_brand_voice(&self.ctx, &raw).await;
            if !formatted.is_success() {
                warn!("brand voice rewrite failed, returning unformatted answer");
            }
            let answer = formatted.text_or(raw);
            trace.add_step(formatted.into_trace());
            answer
        };

        history.push(Message::user(query));
        history.push(Message::assistant(answer.clone()));

        root.record("completed", true);
        root.record("steps_completed", 3);
        RoutedResponse {
            classification,
            answer,
            trace,
        }
    }

    async fn handle(
        &self,
        query: &str,
        classification: &Classification,
        history: &[Message],
        trace: &mut ExecutionTrace,
    ) -> String {
        let models = self.ctx.models();
        let fixtures = self.ctx.fixtures();

        let (step, user_prompt) = match classification.query_type {
            QueryType::Product => {
                let catalog = serde_json::to_string_pretty(&fixtures.products())
                    .unwrap_or_else(|_| "[]".to_string());
                (
                    PromptStep::new("product_handler", &models.product_handler)
                        .system_prompt(PRODUCT_HANDLER_PROMPT),
                    format!(
                        "Customer query about KETL Mtn. products: '{}'\n\nProduct database:\n{}\n\n\
                         Based on this information, provide a detailed answer to the customer's query. \
                         Reference the product catalog to ensure accuracy.",
                        query, catalog
                    ),
                )
            }
            QueryType::Company => (
                PromptStep::new("company_handler", &models.company_handler)
                    .system_prompt(COMPANY_HANDLER_PROMPT),
                format!(
                    "Customer query about KETL Mtn. as a company: '{}'\n\nCompany information:\n{}\n\n\
                     Based on this information, provide a detailed answer to the customer's query.",
                    query,
                    fixtures.company_info()
                ),
            ),
            QueryType::Warranty => (
                PromptStep::new("warranty_handler", &models.warranty_handler)
                    .system_prompt(WARRANTY_HANDLER_PROMPT),
                format!(
                    "Customer query about KETL Mtn. warranty or repairs: '{}'\n\nWarranty information:\n{}\n\n\
                     Based on this information, provide a detailed answer to the customer's query.",
                    query,
                    fixtures.warranty_info()
                ),
            ),
            QueryType::Unclear => {
                return format!("{} {}", classification.explanation, CLARIFICATION_REQUEST);
            }
        };

        let output = step.run(&self.ctx, &user_prompt, Some(history)).await;
        let raw = output.text_or(HANDLER_UNAVAILABLE);
        trace.add_step(output.into_trace());
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComposerError;
    use crate::fixtures::InMemoryFixtureStore;
    use crate::telemetry::AttributeValue;
    use crate::workflow::classifier::UNREADABLE_QUERY;
    use crate::workflow::test_support::{
        context_with, system_prompt, user_prompt, ScriptedProvider,
    };
    use std::sync::Arc;

    fn fixtures() -> InMemoryFixtureStore {
        InMemoryFixtureStore::builder()
            .company_info("Founded in the Sierra foothills.")
            .warranty_info("Lifetime guarantee on every stitch.")
            .style_guide("Friendly and brief.")
            .build()
    }

    /// Classifier answers `classification`, everything else echoes which
    /// handler was reached.
    fn provider(classification: &'static str) -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::respond_with(move |req| {
            let system = system_prompt(req);
            if system.contains("query classifier") {
                Ok(classification.to_string())
            } else if system.contains("voice of KETL") {
                Ok(format!("formatted: {}", user_prompt(req).lines().nth(1).unwrap_or("")))
            } else if system.contains("customer service representative") {
                Ok("warranty answer".to_string())
            } else if system.contains("company representative") {
                Ok("company answer".to_string())
            } else {
                Ok("product answer".to_string())
            }
        }))
    }

    #[tokio::test]
    async fn test_warranty_query_is_routed() {
        let provider = provider(
            r#"{"query_type": "warranty", "confidence": 92, "explanation": "repairs"}"#,
        );
        let (ctx, sink) = context_with(provider.clone(), fixtures());

        let mut history = Vec::new();
        let response = QueryRouter::new(ctx)
            .route("My zipper broke, can you fix it?", &mut history)
            .await;

        assert_eq!(response.classification.query_type, QueryType::Warranty);
        assert_eq!(response.answer, "formatted: warranty answer");
        assert_eq!(history.len(), 2);

        let handler_call = &provider.calls()[1];
        assert!(user_prompt(handler_call).contains("Lifetime guarantee on every stitch."));

        assert_eq!(
            sink.span_names(),
            vec![
                "routing_pattern",
                "classify_query",
                "query_classifier",
                "handle_query",
                "warranty_handler",
                "format_response"
            ]
        );
        let handle = &sink.named("handle_query")[0];
        assert_eq!(
            handle.attribute("handler"),
            Some(&AttributeValue::Str("warranty".into()))
        );
    }

    #[tokio::test]
    async fn test_company_query_uses_company_info() {
        let provider = provider(
            r#"{"query_type": "company", "confidence": 88, "explanation": "about us"}"#,
        );
        let (ctx, _sink) = context_with(provider.clone(), fixtures());

        let mut history = Vec::new();
        let response = QueryRouter::new(ctx).route("Where are you based?", &mut history).await;
        assert_eq!(response.answer, "formatted: company answer");
        assert!(user_prompt(&provider.calls()[1]).contains("Founded in the Sierra foothills."));
    }

    #[tokio::test]
    async fn test_unclear_query_asks_for_clarification() {
        let provider = provider("not json at all");
        let (ctx, _sink) = context_with(provider.clone(), fixtures());

        let mut history = Vec::new();
        let response = QueryRouter::new(ctx).route("hmm?", &mut history).await;

        assert_eq!(response.classification.query_type, QueryType::Unclear);
        assert_eq!(response.classification.confidence, 0.0);
        // classifier + formatter only
        assert_eq!(provider.call_count(), 2);
        let formatter_input = user_prompt(&provider.calls()[1]).to_string();
        assert!(formatter_input.contains(UNREADABLE_QUERY));
        assert!(formatter_input.contains(CLARIFICATION_REQUEST));
    }

    #[tokio::test]
    async fn test_failed_format_returns_handler_answer() {
        let provider = Arc::new(ScriptedProvider::sequence(vec![
            Ok(r#"{"query_type": "product", "confidence": 70, "explanation": "hats"}"#.into()),
            Ok("The Trail Cap is $35.".into()),
            Err(ComposerError::Llm("503".into())),
        ]));
        let (ctx, _sink) = context_with(provider, fixtures());

        let mut history = Vec::new();
        let response = QueryRouter::new(ctx).route("Hat prices?", &mut history).await;
        assert_eq!(response.answer, "The Trail Cap is $35.");
        assert_eq!(response.trace.degraded_steps(), vec!["format_response"]);
        assert_eq!(history[1].content, "The Trail Cap is $35.");
    }
}
