// Prompt constants for the style stage.

/// Style analysis prompt. Replace `{sample}` before sending.
pub const STYLE_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the writing style of the following text sample.
Produce a concise style guide (4-6 short bullet points) that another writer could follow to imitate it.
Cover:
- Tone and voice (e.g. formal, playful, contrarian)
- Sentence structure and length
- Emoji usage (none, sparing, heavy; which kinds)
- Formatting habits (line breaks, lists, bold claims, questions)

Describe the style only. Do NOT summarize the subject matter.

TEXT SAMPLE:
{sample}"#;
