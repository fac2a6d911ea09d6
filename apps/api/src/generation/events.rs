//! Request, result, and progress-event types for the generation pipeline.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::errors::AppError;
use crate::generation::pipeline::PipelineError;

pub const DEFAULT_TONE: &str = "Professional";
pub const DEFAULT_AUDIENCE: &str = "Tech Professionals";
/// Used as `finalCta` when the caller did not suggest one.
pub const DEFAULT_CTA: &str = "What's your take? Share your thoughts in the comments below.";

// ────────────────────────────────────────────────────────────────────────────
// Request
// ────────────────────────────────────────────────────────────────────────────

/// Raw JSON body of `POST /api/generate`. Every field is optional on the wire
/// so a missing topic can be reported as a validation error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub topic: Option<String>,
    pub tone: Option<String>,
    pub audience: Option<String>,
    pub cta: Option<String>,
    pub style_url: Option<String>,
}

/// A validated generation request with defaults applied. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub tone: String,
    pub audience: String,
    pub cta: Option<String>,
    pub style_url: Option<String>,
}

impl TryFrom<GenerateBody> for GenerationRequest {
    type Error = AppError;

    fn try_from(body: GenerateBody) -> Result<Self, Self::Error> {
        let topic = non_blank(body.topic)
            .ok_or_else(|| AppError::Validation("Topic is required".to_string()))?;

        Ok(GenerationRequest {
            topic,
            tone: non_blank(body.tone).unwrap_or_else(|| DEFAULT_TONE.to_string()),
            audience: non_blank(body.audience).unwrap_or_else(|| DEFAULT_AUDIENCE.to_string()),
            cta: non_blank(body.cta),
            style_url: non_blank(body.style_url),
        })
    }
}

impl GenerationRequest {
    /// The CTA attached to every post: the caller's suggestion or the default.
    pub fn final_cta(&self) -> String {
        self.cta.clone().unwrap_or_else(|| DEFAULT_CTA.to_string())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Result
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hooks {
    pub question_hook: String,
    pub statement_hook: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMetadata {
    pub generation_time_ms: u64,
    pub token_count: u32,
}

/// One finished post. `angle` matches the planned angle at the same index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPost {
    pub angle: String,
    pub content: String,
    pub hooks: Hooks,
    /// Each entry starts with a single `#` and contains no whitespace.
    pub hashtags: Vec<String>,
    pub citations: String,
    pub final_cta: String,
    pub metadata: PostMetadata,
}

// ────────────────────────────────────────────────────────────────────────────
// Progress events
// ────────────────────────────────────────────────────────────────────────────

/// One frame of the response stream. Serializes with exactly one key,
/// e.g. `{"thought": "..."}` or `{"posts": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressEvent {
    Thought(String),
    Angles(Vec<String>),
    Posts(Vec<DraftPost>),
    Error(String),
}

/// Ordered, exclusively-owned channel from the pipeline to the response stream.
/// Sending fails once the client has gone away.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    pub async fn emit(&self, event: ProgressEvent) -> Result<(), PipelineError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| PipelineError::ClientDisconnected)
    }

    pub async fn thought(&self, message: impl Into<String>) -> Result<(), PipelineError> {
        self.emit(ProgressEvent::Thought(message.into())).await
    }

    /// Resolves when the receiving side of the stream is dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}
