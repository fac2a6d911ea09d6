//! Hashtag/Citation Finder — one search-grounded call, parsed best-effort.
//!
//! Expected reply shape:
//! ```text
//! HASHTAGS: #ai #growth
//! CITATIONS:
//! - [Title](url) - description
//! ```
//! A missing section yields an empty list/string, never an error.

use std::sync::OnceLock;

use regex::Regex;

use crate::generation::prompts::HASHTAG_SEARCH_PROMPT_TEMPLATE;
use crate::llm_client::prompts::render;
use crate::llm_client::{GenerationCall, LlmClient, LlmError};

const HASHTAGS_MARKER: &str = "HASHTAGS:";
const CITATIONS_MARKER: &str = "CITATIONS:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFindings {
    pub hashtags: Vec<String>,
    pub citations: String,
}

fn hashtag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"#+([\p{L}\p{N}_]+)").expect("hashtag pattern is valid")
    })
}

/// Hashtags in first-seen order, normalized to a single leading `#`.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for capture in hashtag_pattern().captures_iter(text) {
        let tag = format!("#{}", &capture[1]);
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            tags.push(tag);
        }
    }
    tags
}

/// Everything after the `CITATIONS:` marker, trimmed.
pub fn extract_citations(text: &str) -> String {
    let Some(pos) = text.find(CITATIONS_MARKER) else {
        return String::new();
    };
    let rest = &text[pos + CITATIONS_MARKER.len()..];
    // Closing bold marker when the model writes `**CITATIONS:**`.
    rest.strip_prefix("**").unwrap_or(rest).trim().to_string()
}

/// Splits the search reply into hashtags and citations.
///
/// Hashtags are read from the section before `CITATIONS:` (so URL fragments in
/// citation links are never mistaken for tags), preferring the `HASHTAGS:` line.
pub fn parse_search_reply(text: &str) -> SearchFindings {
    let before_citations = text
        .find(CITATIONS_MARKER)
        .map(|pos| &text[..pos])
        .unwrap_or(text);
    let tag_section = before_citations
        .find(HASHTAGS_MARKER)
        .map(|pos| &before_citations[pos + HASHTAGS_MARKER.len()..])
        .unwrap_or(before_citations);

    SearchFindings {
        hashtags: extract_hashtags(tag_section),
        citations: extract_citations(text),
    }
}

pub async fn find_hashtags_and_citations(
    llm: &LlmClient,
    model: &str,
    body: &str,
) -> Result<SearchFindings, LlmError> {
    let prompt = render(HASHTAG_SEARCH_PROMPT_TEMPLATE, &[("content", body)]);
    let reply = llm
        .call_text(&GenerationCall::new(model, prompt).with_search())
        .await?;
    Ok(parse_search_reply(&reply))
}
