// All LLM prompt templates for the generation pipeline.
// Placeholders in `{braces}` are filled with `str::replace` before sending.

/// Angle planning prompt.
/// Replace: {topic}, {audience}, {count}
pub const PLANNER_PROMPT_TEMPLATE: &str = r#"As a world-class content strategist, analyze the topic "{topic}" for a target audience of {audience}.
Your goal is to brainstorm and then finalize {count} unique, compelling angles for LinkedIn posts.

Think step-by-step:
1. Identify the core concepts of the topic.
2. Consider the audience's pain points, interests, and knowledge level.
3. Brainstorm a list of potential angles (e.g. a contrarian take, a case study, a future prediction, a practical guide).
4. Select the top {count} angles most likely to generate engagement, best first.

After your thought process, output ONLY the final {count} angles as a clean JSON array of short strings:
["Angle 1", "Angle 2"]"#;

/// Post drafting prompt.
/// Replace: {topic}, {angle}, {audience}, {tone}, {style_guide}, {platform_voice}, {plain_text_only}
pub const DRAFTER_PROMPT_TEMPLATE: &str = r#"You are an expert LinkedIn copywriter.
Write the body of a LinkedIn post.

Original topic: "{topic}"
Angle to focus on: "{angle}"
Target audience: "{audience}"
Desired tone: "{tone}"

STYLE GUIDE (imitate it when it is not "None"):
{style_guide}

Requirements:
- Open with a strong one-line hook, then deliver concrete, valuable insights.
- Use short paragraphs separated by line breaks.
- Include 2-3 relevant emojis.
- Do NOT include hashtags or a call-to-action; they are added separately.

{platform_voice}
{plain_text_only}"#;

/// Moderation prompt. The reply is either the literal `APPROVED` or a rewrite.
/// Replace: {content}
pub const GUARDRAIL_PROMPT_TEMPLATE: &str = r#"You are a content moderator for a professional networking platform.
Review the LinkedIn post below.

If it is professional, accurate in tone, free of offensive or discriminatory language,
and makes no harmful or defamatory claims, reply with exactly the single word:
APPROVED

Otherwise, reply with a sanitized rewrite of the full post that keeps its message and structure
but fixes every problem. Reply with the rewritten post only.

POST:
{content}"#;

/// Question-form hook rewrite.
/// Replace: {opening_line}, {plain_text_only}
pub const QUESTION_HOOK_PROMPT_TEMPLATE: &str = r#"Rewrite the following opening line of a LinkedIn post as an intriguing question
that makes the reader want to keep reading. Keep it to one sentence.

OPENING LINE:
{opening_line}

{plain_text_only}"#;

/// Statement-form hook rewrite.
/// Replace: {opening_line}, {plain_text_only}
pub const STATEMENT_HOOK_PROMPT_TEMPLATE: &str = r#"Rewrite the following opening line of a LinkedIn post as a bold, surprising statement
that stops the scroll. Keep it to one sentence.

OPENING LINE:
{opening_line}

{plain_text_only}"#;

/// Search-grounded hashtag and citation lookup.
/// Replace: {content}
pub const HASHTAG_SEARCH_PROMPT_TEMPLATE: &str = r#"Use search to research the LinkedIn post below.

1. Find 5-7 currently trending, relevant hashtags for it.
2. Find 2-3 credible sources that support its main claims.

Reply in EXACTLY this format and nothing else:
HASHTAGS: #example #another #third
CITATIONS:
- [Source title](https://source.url) - one-line description
- [Source title](https://source.url) - one-line description

POST:
{content}"#;
