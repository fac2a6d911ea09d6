//! Angle Planner — one streamed call that reasons about the topic and returns
//! an ordered, best-first list of content angles.

use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::generation::events::{EventSink, GenerationRequest};
use crate::generation::pipeline::{PipelineError, Stage};
use crate::generation::prompts::PLANNER_PROMPT_TEMPLATE;
use crate::llm_client::prompts::render;
use crate::llm_client::{strip_json_fences, FragmentKind, GenerationCall, LlmClient};

/// Number of angles requested from the planner (and therefore posts per request).
pub const ANGLE_COUNT: usize = 2;

#[derive(Debug, Error)]
pub enum AngleParseError {
    #[error("planner output is not a JSON array of strings: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("planner returned no angles")]
    Empty,
}

pub fn build_planner_call(model: &str, request: &GenerationRequest) -> GenerationCall {
    let count = ANGLE_COUNT.to_string();
    let prompt = render(
        PLANNER_PROMPT_TEMPLATE,
        &[
            ("topic", request.topic.as_str()),
            ("audience", request.audience.as_str()),
            ("count", count.as_str()),
        ],
    );
    GenerationCall::new(model, prompt).json().with_reasoning()
}

/// Parses the planner's final answer as a strict array of strings.
/// There is no fallback list: a malformed answer fails the request.
/// Extra angles beyond `ANGLE_COUNT` are dropped; the list is best-first.
pub fn parse_angles(text: &str) -> Result<Vec<String>, AngleParseError> {
    let angles: Vec<String> = serde_json::from_str(strip_json_fences(text))?;
    let mut angles: Vec<String> = angles
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();

    if angles.is_empty() {
        return Err(AngleParseError::Empty);
    }
    if angles.len() != ANGLE_COUNT {
        warn!(
            "Planner returned {} angles, expected {ANGLE_COUNT}",
            angles.len()
        );
        angles.truncate(ANGLE_COUNT);
    }
    Ok(angles)
}

/// Streams the planning call. Reasoning fragments are forwarded to the client
/// as they arrive; answer fragments are buffered and parsed once the stream ends.
pub async fn plan_angles(
    llm: &LlmClient,
    model: &str,
    request: &GenerationRequest,
    sink: &EventSink,
) -> Result<Vec<String>, PipelineError> {
    let upstream = |source| PipelineError::Upstream {
        stage: Stage::Planning,
        source,
    };

    let mut stream = llm
        .call_stream(&build_planner_call(model, request))
        .await
        .map_err(upstream)?;

    let mut answer = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment.map_err(upstream)?;
        match fragment.kind {
            FragmentKind::Reasoning => sink.thought(fragment.text).await?,
            FragmentKind::Answer => answer.push_str(&fragment.text),
        }
    }

    debug!("Planner answer: {answer}");
    Ok(parse_angles(&answer)?)
}
