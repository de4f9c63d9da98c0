//! Parallelization
//!
//! Translate one product's name, features and fabric details into several
//! languages at once. Every (language, field) pair is an independent model
//! call; all of them are awaited together with [`join_all`].

use futures::future::join_all;
use std::fmt;
use tracing::{debug, info, warn};

use crate::context::PatternContext;
use crate::telemetry::{kv, SpanScope};

use super::step::{PromptStep, StepFailure};

/// A translatable product field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    Name,
    Features,
    Fabric,
}

impl ProductField {
    pub const ALL: [ProductField; 3] = [ProductField::Name, ProductField::Features, ProductField::Fabric];

    pub fn label(&self) -> &'static str {
        match self {
            ProductField::Name => "Name",
            ProductField::Features => "Features",
            ProductField::Fabric => "Fabric",
        }
    }
}

/// English source text for the three fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductText {
    pub name: String,
    pub features: String,
    pub fabric: String,
}

impl ProductText {
    pub fn get(&self, field: ProductField) -> &str {
        match field {
            ProductField::Name => &self.name,
            ProductField::Features => &self.features,
            ProductField::Fabric => &self.fabric,
        }
    }

    fn set(&mut self, field: ProductField, text: String) {
        match field {
            ProductField::Name => self.name = text,
            ProductField::Features => self.features = text,
            ProductField::Fabric => self.fabric = text,
        }
    }
}

/// All three fields in one target language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTranslation {
    pub language: String,
    pub text: ProductText,
}

/// Product with its translations, languages in request order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTranslation {
    pub product_id: u32,
    pub original: ProductText,
    pub translations: Vec<LanguageTranslation>,
}

impl ProductTranslation {
    pub fn language(&self, language: &str) -> Option<&ProductText> {
        self.translations
            .iter()
            .find(|t| t.language == language)
            .map(|t| &t.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationResult {
    Translated(ProductTranslation),
    Error(String),
}

impl TranslationResult {
    pub fn error(message: impl Into<String>) -> Self {
        TranslationResult::Error(message.into())
    }

    pub fn translated(&self) -> Option<&ProductTranslation> {
        match self {
            TranslationResult::Translated(t) => Some(t),
            TranslationResult::Error(_) => None,
        }
    }
}

impl fmt::Display for TranslationResult {
    /// English block first, then each language with the original under
    /// every translated field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self {
            TranslationResult::Error(message) => return write!(f, "Error: {}", message),
            TranslationResult::Translated(result) => result,
        };

        let original = &result.original;
        let mut lines = vec![
            format!("Product ID: {}", result.product_id),
            format!("Original Name: {}\n", original.name),
            "=== English (Original) ===".to_string(),
            format!("Name: {}", original.name),
            format!("Features: {}", original.features),
            format!("Fabric: {}", original.fabric),
            String::new(),
        ];

        for translation in &result.translations {
            lines.push(format!("=== {} ===", translation.language));
            for field in ProductField::ALL {
                lines.push(format!("{}: {}", field.label(), translation.text.get(field)));
                lines.push(format!("  Original: {}", original.get(field)));
                lines.push(String::new());
            }
            lines.push(String::new());
        }

        f.write_str(&lines.join("\n"))
    }
}

/// Concurrent multi-language product translator
#[derive(Debug, Clone)]
pub struct ProductTranslator {
    ctx: PatternContext,
}

impl ProductTranslator {
    pub fn new(ctx: PatternContext) -> Self {
        Self { ctx }
    }

    /// Languages with a configured model, sorted by name
    pub fn supported_languages(&self) -> Vec<&str> {
        self.ctx.models().translation.keys().map(String::as_str).collect()
    }

    /// Translate a catalog product into every supported language in
    /// `languages`. Unsupported languages are skipped and repeated ones are
    /// translated once, in first-seen order.
    pub async fn translate(&self, product_id: u32, languages: &[&str]) -> TranslationResult {
        let root = SpanScope::enter(
            self.ctx.sink(),
            "translate_product",
            &[
                kv("product_id", product_id),
                kv("languages", languages.join(",")),
                kv("pattern", "parallelization"),
            ],
        );

        let Some(product) = self.ctx.fixtures().find_product(product_id) else {
            let message = format!("Product ID {} not found", product_id);
            warn!(product_id, "cannot translate unknown product");
            root.record("error", message.as_str());
            root.record("success", false);
            return TranslationResult::error(message);
        };
        root.record("product_name", product.name.as_str());

        let original = ProductText {
            name: product.name,
            features: product.features,
            fabric: product.fabric_details,
        };

        let table = &self.ctx.models().translation;
        let mut targets: Vec<(&str, &str)> = Vec::with_capacity(languages.len());
        for &language in languages {
            if targets.iter().any(|&(seen, _)| seen == language) {
                debug!(language = %language, "ignoring repeated language");
                continue;
            }
            match table.get(language) {
                Some(model) => targets.push((language, model.as_str())),
                None => warn!(language = %language, "skipping unsupported language"),
            }
        }

        info!(
            product_id,
            languages = targets.len(),
            "translating product"
        );

        let jobs = targets.iter().flat_map(|&(language, model)| {
            ProductField::ALL
                .into_iter()
                .map(move |field| (language, model, field))
        });
        let futures = jobs
            .clone()
            .map(|(language, model, field)| self.translate_text(original.get(field), language, model));
        let texts = join_all(futures).await;

        let mut translations: Vec<LanguageTranslation> = targets
            .iter()
            .map(|&(language, _)| LanguageTranslation {
                language: language.to_string(),
                text: ProductText::default(),
            })
            .collect();
        for ((language, _, field), text) in jobs.zip(texts) {
            if let Some(entry) = translations.iter_mut().find(|t| t.language == language) {
                entry.text.set(field, text);
            }
        }

        root.end(&[
            kv("success", true),
            kv("languages_completed", translations.len()),
            kv("fields_per_language", ProductField::ALL.len()),
        ]);

        TranslationResult::Translated(ProductTranslation {
            product_id,
            original,
            translations,
        })
    }

    /// One field into one language. Failures come back as `"Error: {message}"`.
    async fn translate_text(&self, text: &str, language: &str, model: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let step = PromptStep::new(format!("translate_to_{}", language), model).system_prompt(format!(
            "You are a professional translator specializing in outdoor apparel terminology.\n\
             Translate the provided text into {}.\n\n\
             ONLY respond with the translated text, nothing else.",
            language
        ));
        let output = step
            .run(
                &self.ctx,
                &format!("Translate this text to {}: {}", language, text),
                None,
            )
            .await;

        match output.failure() {
            None => output.text_or(""),
            Some(StepFailure::EmptyReply) => String::new(),
            Some(StepFailure::CallFailed(message)) => format!("Error: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComposerError;
    use crate::fixtures::{InMemoryFixtureStore, ProductRecord};
    use crate::telemetry::AttributeValue;
    use crate::workflow::test_support::{context_with, system_prompt, user_prompt, ScriptedProvider};
    use std::sync::Arc;

    fn fixtures() -> InMemoryFixtureStore {
        InMemoryFixtureStore::builder()
            .product(
                ProductRecord::new(1, "Vent Hoodie")
                    .with_features("Packable hood")
                    .with_fabric_details("Recycled nylon"),
            )
            .build()
    }

    /// Replies "[{language}] {text}" and fails every Arabic call
    fn provider() -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::respond_with(|req| {
            let system = system_prompt(req);
            let language = ["Spanish", "French", "German", "Japanese", "Arabic"]
                .into_iter()
                .find(|l| system.contains(l))
                .unwrap_or("?");
            if language == "Arabic" {
                return Err(ComposerError::Llm("model overloaded".into()));
            }
            let text = user_prompt(req).split_once(": ").map(|(_, t)| t).unwrap_or("");
            Ok(format!("[{}] {}", language, text))
        }))
    }

    #[tokio::test]
    async fn test_translates_every_field_per_language() {
        let provider = provider();
        let (ctx, sink) = context_with(provider.clone(), fixtures());

        let result = ProductTranslator::new(ctx)
            .translate(1, &["Spanish", "Klingon", "Japanese"])
            .await;
        let translated = result.translated().unwrap();

        assert_eq!(provider.call_count(), 6);
        let langs: Vec<&str> = translated.translations.iter().map(|t| t.language.as_str()).collect();
        assert_eq!(langs, vec!["Spanish", "Japanese"]);

        let spanish = translated.language("Spanish").unwrap();
        assert_eq!(spanish.name, "[Spanish] Vent Hoodie");
        assert_eq!(spanish.fabric, "[Spanish] Recycled nylon");
        assert_eq!(translated.language("Japanese").unwrap().features, "[Japanese] Packable hood");

        assert_eq!(sink.named("translate_to_Spanish").len(), 3);
        assert_eq!(sink.named("translate_product").len(), 1);

        let japanese = provider
            .calls()
            .into_iter()
            .find(|c| system_prompt(c).contains("Japanese"))
            .unwrap();
        assert_eq!(japanese.model.as_deref(), Some("qwen-2.5-32b"));
    }

    #[tokio::test]
    async fn test_repeated_language_translated_once() {
        let provider = provider();
        let (ctx, sink) = context_with(provider.clone(), fixtures());

        let result = ProductTranslator::new(ctx)
            .translate(1, &["Spanish", "French", "Spanish"])
            .await;
        let translated = result.translated().unwrap();

        assert_eq!(provider.call_count(), 6);
        let langs: Vec<&str> = translated.translations.iter().map(|t| t.language.as_str()).collect();
        assert_eq!(langs, vec!["Spanish", "French"]);
        assert_eq!(translated.language("Spanish").unwrap().name, "[Spanish] Vent Hoodie");

        let root = &sink.named("translate_product")[0];
        assert!(root.is_closed());
        assert_eq!(root.attribute("languages_completed"), Some(&AttributeValue::Int(2)));
    }

    #[tokio::test]
    async fn test_failed_calls_become_error_text() {
        let (ctx, _sink) = context_with(provider(), fixtures());

        let result = ProductTranslator::new(ctx).translate(1, &["Arabic"]).await;
        let arabic = result.translated().unwrap().language("Arabic").unwrap().clone();
        assert_eq!(arabic.name, "Error: LLM error: model overloaded");
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let provider = provider();
        let (ctx, _sink) = context_with(provider.clone(), fixtures());

        let result = ProductTranslator::new(ctx).translate(99, &["French"]).await;
        assert_eq!(result, TranslationResult::error("Product ID 99 not found"));
        assert_eq!(result.to_string(), "Error: Product ID 99 not found");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_fields_are_not_sent() {
        let provider = provider();
        let fixtures = InMemoryFixtureStore::builder()
            .product(ProductRecord::new(2, "Trail Cap"))
            .build();
        let (ctx, _sink) = context_with(provider.clone(), fixtures);

        let result = ProductTranslator::new(ctx).translate(2, &["German"]).await;
        assert_eq!(provider.call_count(), 1);
        assert_eq!(result.translated().unwrap().language("German").unwrap().features, "");
    }

    #[test]
    fn test_display_layout() {
        let result = TranslationResult::Translated(ProductTranslation {
            product_id: 1,
            original: ProductText {
                name: "Hoodie".into(),
                features: "Light".into(),
                fabric: "Nylon".into(),
            },
            translations: vec![LanguageTranslation {
                language: "Spanish".into(),
                text: ProductText {
                    name: "Sudadera".into(),
                    features: "Ligera".into(),
                    fabric: "Nailon".into(),
                },
            }],
        });

        let expected = "Product ID: 1\n\
                        Original Name: Hoodie\n\n\
                        === English (Original) ===\n\
                        Name: Hoodie\n\
                        Features: Light\n\
                        Fabric: Nylon\n\
                        \n\
                        === Spanish ===\n\
                        Name: Sudadera\n  Original: Hoodie\n\n\
                        Features: Ligera\n  Original: Light\n\n\
                        Fabric: Nailon\n  Original: Nylon\n\n";
        assert_eq!(result.to_string(), expected);
    }
}
