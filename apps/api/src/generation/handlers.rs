//! Axum route handlers for the Generation API.

use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::events::{EventSink, GenerateBody, GenerationRequest, ProgressEvent};
use crate::generation::pipeline::Pipeline;
use crate::state::AppState;

/// Frames buffered between the pipeline and a slow client.
const EVENT_BUFFER: usize = 64;

/// POST /api/generate
///
/// Validates the body, then streams progress as `data: {json}` frames until the
/// pipeline emits its terminal `posts` or `error` frame and the stream closes.
/// The pipeline is abandoned (in-flight upstream calls dropped) as soon as the
/// client disconnects.
pub async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload?;
    let request = GenerationRequest::try_from(body)?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let sink = EventSink::new(tx);
    let request_id = Uuid::new_v4();

    tokio::spawn(
        async move {
            info!(
                "Generating posts for topic \"{}\" (style source: {})",
                request.topic,
                request.style_url.as_deref().unwrap_or("none")
            );
            let pipeline = Pipeline::new(
                &state.llm,
                state.scraper.as_ref(),
                &state.settings,
                &sink,
            );
            tokio::select! {
                stage = pipeline.execute(&request) => info!("Generation finished ({stage})"),
                _ = sink.closed() => warn!("Client disconnected; abandoning in-flight generation"),
            }
        }
        .instrument(info_span!("generate", %request_id)),
    );

    let frames = ReceiverStream::new(rx).map(to_frame);
    Ok(([(header::CONNECTION, "keep-alive")], Sse::new(frames)).into_response())
}

fn to_frame(event: ProgressEvent) -> Result<Event, Infallible> {
    Ok(Event::default().json_data(&event).unwrap_or_else(|e| {
        warn!("Dropping unserializable progress event: {e}");
        Event::default().data(r#"{"error":"Internal error"}"#)
    }))
}
