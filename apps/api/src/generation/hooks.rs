//! Hook Generator — two alternative openers for A/B comparison.

use std::time::Duration;

use crate::generation::events::Hooks;
use crate::generation::prompts::{QUESTION_HOOK_PROMPT_TEMPLATE, STATEMENT_HOOK_PROMPT_TEMPLATE};
use crate::llm_client::prompts::{render, PLAIN_TEXT_ONLY};
use crate::llm_client::{GenerationCall, LlmClient, LlmError};

/// The body up to its first line break.
pub fn opening_line(body: &str) -> &str {
    body.trim_start().lines().next().unwrap_or("").trim()
}

fn hook_call(model: &str, template: &str, opening: &str) -> GenerationCall {
    let prompt = render(
        template,
        &[("opening_line", opening), ("plain_text_only", PLAIN_TEXT_ONLY)],
    );
    GenerationCall::new(model, prompt)
}

/// Question hook first, then the statement hook after `pause`. Never concurrent.
pub async fn generate_hooks(
    llm: &LlmClient,
    model: &str,
    body: &str,
    pause: Duration,
) -> Result<Hooks, LlmError> {
    let opening = opening_line(body);

    let question_hook = llm
        .call_text(&hook_call(model, QUESTION_HOOK_PROMPT_TEMPLATE, opening))
        .await?;

    tokio::time::sleep(pause).await;

    let statement_hook = llm
        .call_text(&hook_call(model, STATEMENT_HOOK_PROMPT_TEMPLATE, opening))
        .await?;

    Ok(Hooks {
        question_hook: question_hook.trim().to_string(),
        statement_hook: statement_hook.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::*;
    use crate::llm_client::fake::FakeGenerator;
    use crate::llm_client::retry::RetryPolicy;

    #[test]
    fn test_opening_line_stops_at_first_break() {
        assert_eq!(opening_line("Hook here 🚀\n\nMore text"), "Hook here 🚀");
    }

    #[test]
    fn test_opening_line_skips_leading_blank_lines() {
        assert_eq!(opening_line("\n\n  First real line\nsecond"), "First real line");
    }

    #[test]
    fn test_opening_line_of_single_line_body() {
        assert_eq!(opening_line("Only line"), "Only line");
        assert_eq!(opening_line(""), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hooks_are_sequential_with_pause() {
        let fake = Arc::new(FakeGenerator::new(|call| {
            let text = if call.prompt.contains("intriguing question") {
                "Why do cold starts still hurt?"
            } else {
                "Cold starts are a tax you choose to pay."
            };
            Ok(crate::llm_client::fake::completion(text))
        }));
        let llm = LlmClient::new(fake.clone(), RetryPolicy::immediate());
        let started = Instant::now();

        let hooks = generate_hooks(
            &llm,
            "writer",
            "Cold starts cost you users.\nMore.",
            Duration::from_millis(1500),
        )
        .await
        .unwrap();

        assert_eq!(hooks.question_hook, "Why do cold starts still hurt?");
        assert_eq!(hooks.statement_hook, "Cold starts are a tax you choose to pay.");
        assert_eq!(started.elapsed(), Duration::from_millis(1500));

        let calls = fake.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.prompt.contains("Cold starts cost you users.")));
        assert!(calls.iter().all(|c| !c.prompt.contains("More.")));
    }
}
