//! Quality Guardrail — moderation gate between drafting and hook/hashtag generation.

use tracing::{info, warn};

use crate::generation::prompts::GUARDRAIL_PROMPT_TEMPLATE;
use crate::llm_client::prompts::render;
use crate::llm_client::{GenerationCall, LlmClient, LlmError};

pub const APPROVED: &str = "APPROVED";

/// Applies a moderation verdict: `APPROVED` keeps the draft, anything else
/// replaces it verbatim.
pub fn apply_verdict(draft: String, verdict: &str) -> String {
    if verdict.trim() == APPROVED {
        draft
    } else {
        verdict.to_string()
    }
}

/// Returns the body downstream steps must operate on.
pub async fn review_draft(llm: &LlmClient, model: &str, draft: String) -> Result<String, LlmError> {
    let prompt = render(GUARDRAIL_PROMPT_TEMPLATE, &[("content", draft.as_str())]);
    let verdict = llm.call_text(&GenerationCall::new(model, prompt)).await?;

    if verdict.trim() == APPROVED {
        info!("Guardrail approved draft");
    } else {
        warn!("Guardrail replaced draft with sanitized rewrite");
    }
    Ok(apply_verdict(draft, &verdict))
}
