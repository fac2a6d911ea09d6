// Style extraction: scrape a reference page, then summarize its voice.
// Every failure in here degrades to `StyleGuide::None`; nothing is fatal.

pub mod analyzer;
pub mod prompts;
pub mod scrape;
