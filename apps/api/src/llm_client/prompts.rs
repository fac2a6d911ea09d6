// Shared prompt fragments. Each pipeline step keeps its own templates in
// generation/prompts.rs and composes these where needed.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Appended to steps whose output is pasted into a post verbatim.
pub const PLAIN_TEXT_ONLY: &str = "Return ONLY the requested text. \
    Do NOT add a preamble, explanations, quotation marks, or markdown code fences.";

/// Keeps generated copy in the platform's professional register.
pub const PLATFORM_VOICE: &str = "Write for LinkedIn: professional, human, \
    and specific. Avoid clickbait, slurs, personal attacks, and unverifiable claims.";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"))
}

/// Fills `{name}` placeholders in one pass. Substituted text is never
/// rescanned, so user input containing `{...}` arrives verbatim. Unknown
/// placeholders are left as written.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
