pub mod health;

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::generation::handlers;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation API
        .route("/api/generate", post(handlers::handle_generate))
        .fallback(not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::generation::pipeline::{ModelConfig, PipelineSettings};
    use crate::llm_client::fake::FakeGenerator;
    use crate::llm_client::retry::RetryPolicy;
    use crate::llm_client::LlmClient;
    use crate::style::scrape::PageScraper;

    struct NoScraper;

    #[async_trait]
    impl PageScraper for NoScraper {
        async fn scrape_text(&self, _url: &str) -> String {
            String::new()
        }
    }

    fn app() -> Router {
        build_router(AppState {
            llm: LlmClient::new(
                Arc::new(FakeGenerator::replying("unused")),
                RetryPolicy::immediate(),
            ),
            scraper: Arc::new(NoScraper),
            settings: PipelineSettings {
                models: ModelConfig {
                    planner: "planner".to_string(),
                    writer: "writer".to_string(),
                },
                angle_delay: Duration::ZERO,
                hook_delay: Duration::ZERO,
            },
        })
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "postgen");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = app()
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "No route for /api/nope");
    }
}
