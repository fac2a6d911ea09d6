use std::sync::Arc;

use crate::generation::pipeline::PipelineSettings;
use crate::llm_client::LlmClient;
use crate::style::scrape::PageScraper;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only after startup; each request builds its own pipeline from it.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    /// Fetches style-source pages. Default: HttpPageScraper.
    pub scraper: Arc<dyn PageScraper>,
    pub settings: PipelineSettings,
}
