// Post generation engine.
// Implements: angle planning, drafting, guardrail review, hooks, hashtag/citation search,
// and the orchestrator that streams progress for each request.
// All model calls go through llm_client; nothing here talks to Gemini directly.

pub mod drafter;
pub mod events;
pub mod guardrail;
pub mod handlers;
pub mod hashtags;
pub mod hooks;
pub mod pipeline;
pub mod planner;
pub mod prompts;
