//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (one quiz session per connection)
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/categories", get(http::http_get_categories))
        .route("/api/v1/leaderboard", get(http::http_get_leaderboard))
        .route("/api/v1/assistant/complete", post(http::http_post_complete))
        .route("/api/v1/assistant/questions", post(http::http_post_generate))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::domain::ResultRecord;
    use crate::store::{MemoryResultsStore, ResultsStore};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::with_parts(AppConfig::default(), Arc::new(MemoryResultsStore::new()), None))
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_assistant_off() {
        let (status, body) = call(build_router(state()), Request::get("/api/v1/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["assistant"], false);
    }

    #[tokio::test]
    async fn categories_lists_the_seed_bank() {
        let (_, body) = call(build_router(state()), Request::get("/api/v1/categories").body(Body::empty()).unwrap()).await;
        let cats: Vec<String> = serde_json::from_value(body["categories"].clone()).unwrap();
        assert!(cats.contains(&"Math".to_string()));
        assert!(cats.contains(&"Science".to_string()));
    }

    #[tokio::test]
    async fn leaderboard_is_sorted_and_limited() {
        let st = state();
        for (name, score) in [("A", 3), ("B", 5), ("C", 1)] {
            st.store
                .append_result(&ResultRecord {
                    name: name.into(),
                    email: String::new(),
                    category: "Math".into(),
                    score,
                    total: 5,
                    timestamp: chrono::Utc::now(),
                })
                .await
                .unwrap();
        }
        let (status, body) = call(build_router(st), Request::get("/api/v1/leaderboard?limit=2").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body["entries"].as_array().unwrap().iter().map(|e| e["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[tokio::test]
    async fn blank_prompt_is_a_bad_request() {
        let (status, body) = call(build_router(state()), post_json("/api/v1/assistant/complete", r#"{"prompt":"  "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn generation_without_assistant_is_empty() {
        let (status, body) = call(build_router(state()), post_json("/api/v1/assistant/questions", r#"{"text":"the solar system"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["questions"].as_array().unwrap().len(), 0);
    }
}
