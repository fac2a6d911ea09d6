//! Generation Pipeline — orchestrates every upstream call for one request.
//!
//! Flow: style analysis (optional) → angle planning → for each angle, strictly
//!       in order: draft → guardrail → hooks (two calls) → hashtags/citations.
//!
//! Calls are never issued concurrently. Rate limits are the dominant failure
//! mode upstream, so the pipeline trades latency for reliability with fixed
//! pauses between angles and between the paired hook calls.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::generation::drafter::draft_post;
use crate::generation::events::{DraftPost, EventSink, GenerationRequest, ProgressEvent};
use crate::generation::guardrail::review_draft;
use crate::generation::hashtags::find_hashtags_and_citations;
use crate::generation::hooks::generate_hooks;
use crate::generation::planner::{plan_angles, AngleParseError, ANGLE_COUNT};
use crate::llm_client::{LlmClient, LlmError};
use crate::style::analyzer::{build_style_guide, StyleGuide};
use crate::style::scrape::PageScraper;

/// Error frame value the client renders as "service busy, try again later".
pub const OVERLOADED_SENTINEL: &str = "GEMINI_OVERLOADED";

// ────────────────────────────────────────────────────────────────────────────
// Settings
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Streams reasoning while planning angles.
    pub planner: String,
    /// Drafting, guardrail, hooks, hashtag search and style analysis.
    pub writer: String,
}

/// Pacing injected into the pipeline. Tests use zero delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub models: ModelConfig,
    pub angle_delay: Duration,
    pub hook_delay: Duration,
}

// ────────────────────────────────────────────────────────────────────────────
// State machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    StyleAnalysis,
    Planning,
    /// Zero-based index of the angle being drafted.
    Drafting(usize),
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Idle => f.write_str("idle"),
            Stage::StyleAnalysis => f.write_str("style analysis"),
            Stage::Planning => f.write_str("angle planning"),
            Stage::Drafting(index) => write!(f, "drafting post {}", index + 1),
            Stage::Done => f.write_str("done"),
            Stage::Failed => f.write_str("failed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Angle planning failed: {0}")]
    AngleParse(#[from] AngleParseError),

    #[error("Upstream failure during {stage}: {source}")]
    Upstream { stage: Stage, source: LlmError },

    #[error("Client disconnected")]
    ClientDisconnected,
}

impl PipelineError {
    /// Text of the single `{error}` frame. Internal details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            PipelineError::Upstream { source, .. } if source.is_overloaded() => {
                OVERLOADED_SENTINEL.to_string()
            }
            PipelineError::Upstream {
                source: LlmError::RateLimited { .. },
                ..
            } => "The AI service is receiving too many requests. Please wait a minute and try again."
                .to_string(),
            PipelineError::Upstream { stage, .. } => {
                format!("Post generation failed during {stage}. Please try again.")
            }
            PipelineError::AngleParse(_) => {
                "Could not plan content angles for this topic. Please try again.".to_string()
            }
            PipelineError::ClientDisconnected => "Client disconnected".to_string(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

/// One request's pipeline. Owns its accumulator state; nothing is shared
/// across requests.
pub struct Pipeline<'a> {
    llm: &'a LlmClient,
    scraper: &'a dyn PageScraper,
    settings: &'a PipelineSettings,
    sink: &'a EventSink,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        llm: &'a LlmClient,
        scraper: &'a dyn PageScraper,
        settings: &'a PipelineSettings,
        sink: &'a EventSink,
    ) -> Self {
        Self {
            llm,
            scraper,
            settings,
            sink,
            stage: Stage::Idle,
        }
    }

    #[cfg(test)]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, next: Stage) {
        debug!("Pipeline stage: {} -> {}", self.stage, next);
        self.stage = next;
    }

    /// Runs the pipeline and emits exactly one terminal frame: the ordered
    /// post list, or a single error. Returns the final stage.
    pub async fn execute(mut self, request: &GenerationRequest) -> Stage {
        match self.run(request).await {
            Ok(posts) => {
                info!("Generated {} posts", posts.len());
                if self.sink.emit(ProgressEvent::Posts(posts)).await.is_err() {
                    info!("Client disconnected before results were delivered");
                }
            }
            Err(PipelineError::ClientDisconnected) => {
                info!("Client disconnected; stopping generation");
            }
            Err(e) => {
                error!("Generation failed: {e}");
                // A closed stream here means nobody is left to tell.
                let _ = self
                    .sink
                    .emit(ProgressEvent::Error(e.client_message()))
                    .await;
            }
        }
        self.stage
    }

    /// Runs every stage. Emits progress events but not the terminal frame.
    pub async fn run(
        &mut self,
        request: &GenerationRequest,
    ) -> Result<Vec<DraftPost>, PipelineError> {
        let result = self.run_stages(request).await;
        match result {
            Ok(_) => self.enter(Stage::Done),
            Err(_) => self.enter(Stage::Failed),
        }
        result
    }

    async fn run_stages(
        &mut self,
        request: &GenerationRequest,
    ) -> Result<Vec<DraftPost>, PipelineError> {
        // Step 1: Style analysis (optional, never fatal)
        let style_guide = match &request.style_url {
            Some(url) => {
                self.enter(Stage::StyleAnalysis);
                self.sink
                    .thought(format!("Analyzing the writing style at {url}...\n"))
                    .await?;
                build_style_guide(self.llm, self.scraper, &self.settings.models.writer, url).await
            }
            None => StyleGuide::None,
        };

        // Step 2: Angle planning
        self.enter(Stage::Planning);
        self.sink
            .thought(format!(
                "Planning {ANGLE_COUNT} content angles for \"{}\"...\n",
                request.topic
            ))
            .await?;
        let angles = plan_angles(self.llm, &self.settings.models.planner, request, self.sink).await?;
        info!("Planned {} angles", angles.len());
        self.sink.emit(ProgressEvent::Angles(angles.clone())).await?;

        // Step 3: Draft each angle, one at a time
        let mut posts = Vec::with_capacity(angles.len());
        for (index, angle) in angles.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.settings.angle_delay).await;
            }
            self.enter(Stage::Drafting(index));
            posts.push(
                self.draft_angle(request, &style_guide, angle, index, angles.len())
                    .await?,
            );
        }

        Ok(posts)
    }

    async fn draft_angle(
        &self,
        request: &GenerationRequest,
        style_guide: &StyleGuide,
        angle: &str,
        index: usize,
        total: usize,
    ) -> Result<DraftPost, PipelineError> {
        let stage = self.stage;
        let upstream = move |source| PipelineError::Upstream { stage, source };
        let model = &self.settings.models.writer;

        self.sink
            .thought(format!("Drafting post {} of {}: {angle}\n", index + 1, total))
            .await?;
        let draft = draft_post(self.llm, model, request, angle, style_guide)
            .await
            .map_err(upstream)?;

        self.sink.thought("Running the quality guardrail...\n").await?;
        let content = review_draft(self.llm, model, draft.content)
            .await
            .map_err(upstream)?;

        self.sink.thought("Writing alternative hooks...\n").await?;
        let hooks = generate_hooks(self.llm, model, &content, self.settings.hook_delay)
            .await
            .map_err(upstream)?;

        self.sink
            .thought("Searching for trending hashtags and citations...\n")
            .await?;
        let findings = find_hashtags_and_citations(self.llm, model, &content)
            .await
            .map_err(upstream)?;

        Ok(DraftPost {
            angle: angle.to_string(),
            content,
            hooks,
            hashtags: findings.hashtags,
            citations: findings.citations,
            final_cta: request.final_cta(),
            metadata: draft.metadata,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
