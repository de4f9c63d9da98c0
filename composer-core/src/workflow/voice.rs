//! Brand-voice rewrite shared by the chain and the router

use crate::context::PatternContext;

use super::step::{PromptStep, StepOutput};

/// Span name for the rewrite step
pub const FORMAT_STEP: &str = "format_response";

fn voice_system_prompt(style_guide: &str) -> String {
    format!(
        "You are the voice of KETL Mtn. Apparel, an outdoor gear company known for \
         lightweight, packable, breathable and durable products designed for adventure and travel.\n\n\
         Use the following brand voice guidelines to craft your response:\n\n{}\n\n\
         Keep it short: one or two brief paragraphs, under 75 words, casual and conversational. \
         Answer the question directly and include only the essential details.",
        style_guide
    )
}

/// Rewrite `raw` in the brand voice with the formatter model.
///
/// Callers decide what to do when the rewrite fails; both the chain and
/// the router fall back to the unformatted text.
pub async fn format_in_brand_voice(ctx: &PatternContext, raw: &str) -> StepOutput {
    let step = PromptStep::new(FORMAT_STEP, &ctx.models().formatter)
        .system_prompt(voice_system_prompt(&ctx.fixtures().style_guide()));

    let user_prompt = format!(
        "Original information:\n{}\n\n\
         Rewrite this in KETL Mtn.'s brand voice, making it extremely concise. \
         Your response must be under 75 words total.",
        raw
    );

    step.run(ctx, &user_prompt, None).await
}
