//! Post Drafter — writes the body text for one angle.

use std::time::Instant;

use crate::generation::events::{GenerationRequest, PostMetadata};
use crate::generation::prompts::DRAFTER_PROMPT_TEMPLATE;
use crate::llm_client::prompts::{render, PLAIN_TEXT_ONLY, PLATFORM_VOICE};
use crate::llm_client::{GenerationCall, LlmClient, LlmError};
use crate::style::analyzer::StyleGuide;

/// A drafted body plus the cost of producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub content: String,
    pub metadata: PostMetadata,
}

pub fn build_drafter_call(
    model: &str,
    request: &GenerationRequest,
    angle: &str,
    style_guide: &StyleGuide,
) -> GenerationCall {
    let style_guide = style_guide.to_string();
    let prompt = render(
        DRAFTER_PROMPT_TEMPLATE,
        &[
            ("topic", request.topic.as_str()),
            ("angle", angle),
            ("audience", request.audience.as_str()),
            ("tone", request.tone.as_str()),
            ("style_guide", style_guide.as_str()),
            ("platform_voice", PLATFORM_VOICE),
            ("plain_text_only", PLAIN_TEXT_ONLY),
        ],
    );
    GenerationCall::new(model, prompt)
}

/// Rough token estimate used when the upstream does not report usage.
pub fn estimate_tokens(content: &str) -> u32 {
    (content.chars().count() / 4) as u32
}

pub async fn draft_post(
    llm: &LlmClient,
    model: &str,
    request: &GenerationRequest,
    angle: &str,
    style_guide: &StyleGuide,
) -> Result<Draft, LlmError> {
    let call = build_drafter_call(model, request, angle, style_guide);

    let started = Instant::now();
    let completion = llm.call(&call).await?;
    let generation_time_ms = started.elapsed().as_millis() as u64;

    let content = completion.text.trim().to_string();
    let token_count = completion
        .usage
        .map(|u| u.total_tokens)
        .filter(|&total| total > 0)
        .unwrap_or_else(|| estimate_tokens(&content));

    Ok(Draft {
        content,
        metadata: PostMetadata {
            generation_time_ms,
            token_count,
        },
    })
}
