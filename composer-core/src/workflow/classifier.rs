//! Query classification for the router

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::PatternContext;
use crate::parsing::JsonParser;

use super::execution::StepTrace;
use super::step::PromptStep;

/// Explanation used when the classifier reply cannot be read
pub const UNREADABLE_QUERY: &str =
    "I couldn't understand your question. Could you please clarify what you're asking about?";

const CLASSIFIER_PROMPT: &str = r#"You are a query classifier for KETL Mtn. Apparel, an outdoor gear company.
Determine what type of information the customer is seeking.

ONLY respond with valid JSON in this format:
{
    "query_type": "product" | "company" | "warranty" | "unclear",
    "confidence": 0-100,
    "explanation": "Brief explanation of your classification"
}

Query types:
- "product": specific products, features, pricing, availability
- "company": KETL Mtn. as a company, its values, mission, sustainability
- "warranty": guarantees, repairs, returns or the lifetime warranty
- "unclear": ambiguous questions that fit none of the above

Be decisive. If a query fits several categories, choose the most relevant one.
For unclear queries, say in the explanation what clarification would help."#;

/// Where a customer query should be routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Product,
    Company,
    Warranty,
    #[serde(other)]
    Unclear,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Product => "product",
            QueryType::Company => "company",
            QueryType::Warranty => "warranty",
            QueryType::Unclear => "unclear",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier verdict for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub query_type: QueryType,
    /// 0-100
    pub confidence: f64,
    pub explanation: String,
}

impl Classification {
    /// Used whenever the classifier reply is missing or unreadable
    pub fn unreadable() -> Self {
        Self {
            query_type: QueryType::Unclear,
            confidence: 0.0,
            explanation: UNREADABLE_QUERY.to_string(),
        }
    }
}

/// Classifies queries with the classifier model
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    ctx: PatternContext,
    parser: JsonParser,
}

impl QueryClassifier {
    pub fn new(ctx: PatternContext) -> Self {
        Self {
            ctx,
            parser: JsonParser::new(),
        }
    }

    /// Classify `query`. Never fails: an unusable reply yields
    /// [`Classification::unreadable`].
    pub async fn classify(&self, query: &str) -> (Classification, StepTrace) {
        let step = PromptStep::new("query_classifier", &self.ctx.models().classifier)
            .system_prompt(CLASSIFIER_PROMPT);
        let output = step
            .run(&self.ctx, &format!("Classify this customer query: '{}'", query), None)
            .await;

        let classification = match output.text() {
            Some(reply) => match self.parser.decode::<Classification>(reply) {
                Ok(decoded) => {
                    let mut classification = decoded.value;
                    classification.confidence = classification.confidence.clamp(0.0, 100.0);
                    classification
                }
                Err(e) => {
                    warn!(error = %e, reply = %reply, "failed to parse classifier response");
                    Classification::unreadable()
                }
            },
            None => Classification::unreadable(),
        };

        (classification, output.into_trace())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::test_support::{context, ScriptedProvider};
    use std::sync::Arc;

    async fn classify(reply: &str) -> Classification {
        let provider = Arc::new(ScriptedProvider::sequence(vec![Ok(reply.to_string())]));
        let (ctx, _sink) = context(provider);
        QueryClassifier::new(ctx).classify("anything").await.0
    }

    #[tokio::test]
    async fn test_plain_json() {
        let c = classify(
            r#"{"query_type": "warranty", "confidence": 95, "explanation": "Asks about repairs"}"#,
        )
        .await;
        assert_eq!(c.query_type, QueryType::Warranty);
        assert_eq!(c.confidence, 95.0);
    }

    #[tokio::test]
    async fn test_fenced_json_is_accepted() {
        let c = classify(
            "Here you go:\n```json\n{\"query_type\": \"product\", \"confidence\": 80, \"explanation\": \"hats\"}\n```",
        )
        .await;
        assert_eq!(c.query_type, QueryType::Product);
    }

    #[tokio::test]
    async fn test_unknown_type_is_unclear() {
        let c = classify(r#"{"query_type": "shipping", "confidence": 60, "explanation": "?"}"#).await;
        assert_eq!(c.query_type, QueryType::Unclear);
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back() {
        assert_eq!(classify("product, probably").await, Classification::unreadable());
        assert_eq!(
            classify(r#"{"query_type": "company"}"#).await,
            Classification::unreadable()
        );
        assert_eq!(classify("").await, Classification::unreadable());
    }
}
