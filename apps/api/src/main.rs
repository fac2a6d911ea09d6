mod config;
mod errors;
mod generation;
mod llm_client;
mod routes;
mod state;
mod style;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::gemini::GeminiClient;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::style::scrape::HttpPageScraper;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting postgen API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let retry = config.retry_policy();
    info!(
        "Retry policy: {} attempts, {:?} base delay, {:?} jitter",
        retry.max_attempts, retry.base_delay, retry.jitter
    );
    let llm = LlmClient::new(
        Arc::new(GeminiClient::new(config.google_api_key.clone())?),
        retry,
    );

    let settings = config.pipeline_settings();
    info!(
        "LLM client initialized (planner: {}, writer: {})",
        settings.models.planner, settings.models.writer
    );

    // Build app state
    let state = AppState {
        llm,
        scraper: Arc::new(HttpPageScraper::new()?),
        settings,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict allowed origins once the web client's domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
