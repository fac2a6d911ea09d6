//! Style Analysis — turns a reference page into a short natural-language style guide.

use std::fmt;

use tracing::{info, warn};

use crate::llm_client::prompts::{render, PLAIN_TEXT_ONLY};
use crate::llm_client::{GenerationCall, LlmClient};
use crate::style::prompts::STYLE_ANALYSIS_PROMPT_TEMPLATE;
use crate::style::scrape::PageScraper;

/// Longer samples add cost without improving the summary.
const MAX_SAMPLE_CHARS: usize = 4000;

/// Summary of a reference text's voice, or the `None` sentinel when no
/// usable reference was available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StyleGuide {
    #[default]
    None,
    Summary(String),
}

impl fmt::Display for StyleGuide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleGuide::None => f.write_str("None"),
            StyleGuide::Summary(summary) => f.write_str(summary),
        }
    }
}

/// Scrapes `url` and summarizes its style.
///
/// Never fails: an empty scrape skips the analysis call entirely, and an
/// upstream failure during analysis is logged and degrades to `StyleGuide::None`.
pub async fn build_style_guide(
    llm: &LlmClient,
    scraper: &dyn PageScraper,
    model: &str,
    url: &str,
) -> StyleGuide {
    let sample = scraper.scrape_text(url).await;
    if sample.trim().is_empty() {
        info!("No usable text at style source {url}; continuing without a style guide");
        return StyleGuide::None;
    }

    let sample: String = sample.chars().take(MAX_SAMPLE_CHARS).collect();
    let prompt = format!(
        "{}\n\n{}",
        render(STYLE_ANALYSIS_PROMPT_TEMPLATE, &[("sample", sample.as_str())]),
        PLAIN_TEXT_ONLY
    );

    match llm.call_text(&GenerationCall::new(model, prompt)).await {
        Ok(summary) if !summary.trim().is_empty() => {
            StyleGuide::Summary(summary.trim().to_string())
        }
        Ok(_) => StyleGuide::None,
        Err(e) => {
            warn!("Style analysis failed, continuing without a style guide: {e}");
            StyleGuide::None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::llm_client::fake::FakeGenerator;
    use crate::llm_client::retry::RetryPolicy;
    use crate::llm_client::LlmError;

    struct FixedScraper(String);

    fn scraper(text: &str) -> FixedScraper {
        FixedScraper(text.to_string())
    }

    #[async_trait]
    impl PageScraper for FixedScraper {
        async fn scrape_text(&self, _url: &str) -> String {
            self.0.clone()
        }
    }

    fn client(fake: Arc<FakeGenerator>) -> LlmClient {
        LlmClient::new(fake, RetryPolicy::immediate())
    }

    #[tokio::test]
    async fn test_empty_scrape_skips_analysis_call() {
        let fake = Arc::new(FakeGenerator::replying("should not be used"));
        let guide = build_style_guide(
            &client(fake.clone()),
            &scraper(""),
            "model",
            "https://example.com",
        )
        .await;

        assert_eq!(guide, StyleGuide::None);
        assert_eq!(guide.to_string(), "None");
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test]
    async fn test_sample_is_summarized() {
        let fake = Arc::new(FakeGenerator::replying("  - Short sentences\n- Sparing emoji \n"));
        let guide = build_style_guide(
            &client(fake.clone()),
            &scraper("We ship. Fast. 🚀"),
            "model",
            "https://example.com",
        )
        .await;

        assert_eq!(
            guide,
            StyleGuide::Summary("- Short sentences\n- Sparing emoji".to_string())
        );
        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("We ship. Fast. 🚀"));
    }

    #[tokio::test]
    async fn test_analysis_failure_degrades_to_none() {
        let fake = Arc::new(FakeGenerator::new(|_| {
            Err(LlmError::Api {
                status: 500,
                message: "internal".to_string(),
                retry_after: None,
            })
        }));
        let guide = build_style_guide(
            &client(fake),
            &scraper("Some reference prose."),
            "model",
            "https://example.com",
        )
        .await;

        assert_eq!(guide, StyleGuide::None);
    }

    #[tokio::test]
    async fn test_long_samples_are_truncated() {
        let fake = Arc::new(FakeGenerator::replying("summary"));
        let long = scraper(&"word ".repeat(2000));
        build_style_guide(&client(fake.clone()), &long, "m", "u").await;

        let prompt = &fake.calls()[0].prompt;
        assert!(prompt.len() < STYLE_ANALYSIS_PROMPT_TEMPLATE.len() + MAX_SAMPLE_CHARS + 400);
    }
}
