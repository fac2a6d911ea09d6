/// LLM Client — the single point of entry for all text-generation calls in Postgen.
///
/// ARCHITECTURAL RULE: No other module may call the Generative Language API directly.
/// Pipeline steps receive an `LlmClient`, which wraps an injected `TextGenerator`
/// backend with the rate-limit retry policy.
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use regex::Regex;
use thiserror::Error;

pub mod gemini;
pub mod prompts;
pub mod retry;

#[cfg(test)]
pub mod fake;

use retry::{invoke_with_retry, RetryPolicy};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// Server-suggested wait before retrying, when the error body carried one.
        retry_after: Option<Duration>,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// True for the "too many requests" signal — the only failure the retry wrapper absorbs.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::Api { status: 429, .. })
    }

    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            LlmError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Upstream capacity exhaustion: a 503 marker together with the word "overloaded".
    pub fn is_overloaded(&self) -> bool {
        let rendered = self.to_string().to_lowercase();
        rendered.contains("503") && rendered.contains("overloaded")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// One upstream generation request. Built by each pipeline step.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationCall {
    pub model: String,
    pub prompt: String,
    pub response_format: ResponseFormat,
    /// Ask the model to return its reasoning summaries alongside the answer.
    pub reasoning_traces: bool,
    /// Enable search-grounded generation.
    pub search_tool: bool,
}

impl GenerationCall {
    pub fn new(model: &str, prompt: String) -> Self {
        Self {
            model: model.to_string(),
            prompt,
            response_format: ResponseFormat::Text,
            reasoning_traces: false,
            search_tool: false,
        }
    }

    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    pub fn with_reasoning(mut self) -> Self {
        self.reasoning_traces = true;
        self
    }

    pub fn with_search(mut self) -> Self {
        self.search_tool = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// A finished, non-streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Reasoning,
    Answer,
}

/// A piece of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub text: String,
}

impl Fragment {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Reasoning,
            text: text.into(),
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Answer,
            text: text.into(),
        }
    }
}

/// Lazy, ordered, finite sequence of fragments. Consumed once.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, LlmError>> + Send>>;

/// A text-generation backend. `GeminiClient` in production, a scripted fake in tests.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, call: &GenerationCall) -> Result<Completion, LlmError>;

    async fn generate_stream(&self, call: &GenerationCall) -> Result<FragmentStream, LlmError>;
}

/// The single LLM client used by all pipeline steps.
/// Every call goes through the rate-limit retry wrapper.
#[derive(Clone)]
pub struct LlmClient {
    generator: Arc<dyn TextGenerator>,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(generator: Arc<dyn TextGenerator>, retry: RetryPolicy) -> Self {
        Self { generator, retry }
    }

    pub async fn call(&self, call: &GenerationCall) -> Result<Completion, LlmError> {
        invoke_with_retry(&self.retry, &call.model, || self.generator.generate(call)).await
    }

    /// Convenience wrapper returning only the completion text.
    pub async fn call_text(&self, call: &GenerationCall) -> Result<String, LlmError> {
        Ok(self.call(call).await?.text)
    }

    /// Opens a streamed completion. Only opening the stream is retried;
    /// a failure mid-stream surfaces through the stream itself.
    pub async fn call_stream(&self, call: &GenerationCall) -> Result<FragmentStream, LlmError> {
        invoke_with_retry(&self.retry, &call.model, || {
            self.generator.generate_stream(call)
        })
        .await
    }
}

/// Extracts a retry delay from an upstream error body.
/// Understands `"retryDelay": "37s"` details and "Please retry in 12.5s." prose.
pub fn parse_retry_hint(body: &str) -> Option<Duration> {
    static HINT: OnceLock<Regex> = OnceLock::new();
    let re = HINT.get_or_init(|| {
        Regex::new(r#"(?i)(?:"retryDelay"\s*:\s*"|retry in\s+)(\d+(?:\.\d+)?)s"#)
            .expect("retry hint pattern is valid")
    });

    let seconds: f64 = re.captures(body)?.get(1)?.as_str().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
