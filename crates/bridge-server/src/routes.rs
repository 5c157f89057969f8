//! Route definitions for the bridge API.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{handlers, state::AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/health", get(handlers::health_check))
        .route("/v1/models", get(handlers::list_models))
        .route("/v1/messages", post(handlers::create_message))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bridge_core::{
        BackendHealth, BackendModel, BridgeResult, ChatBackend, ChatRequest, ChatResponse,
        ChunkStream,
    };
    use tower::ServiceExt;

    struct StubBackend;

    #[async_trait]
    impl ChatBackend for StubBackend {
        fn name(&self) -> &str {
            "stub"
        }

        async fn chat(&self, _request: &ChatRequest) -> BridgeResult<ChatResponse> {
            Ok(ChatResponse {
                text: "ok".to_string(),
                finish_reason: Some("stop".to_string()),
                usage: None,
            })
        }

        async fn chat_stream(&self, _request: &ChatRequest) -> BridgeResult<ChunkStream> {
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn list_models(&self) -> BridgeResult<Vec<BackendModel>> {
            Ok(vec![BackendModel {
                id: "stub-model".to_string(),
            }])
        }

        async fn health_check(&self) -> BackendHealth {
            BackendHealth::healthy()
        }
    }

    fn test_state() -> AppState {
        AppState::builder()
            .backend(Arc::new(StubBackend))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_root_serves_health() {
        let app = create_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_models_endpoint() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
