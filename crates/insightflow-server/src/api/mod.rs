//! HTTP surface: the health endpoint, the versioned feature API and the middleware stack

pub mod response;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::features::{self, FeatureState};
use crate::middleware;
use crate::store::SharedStore;

/// Build the application router with all routes and middleware
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    let store = state.store.clone();

    Router::new()
        .route("/health", get(health_check))
        .with_state(store)
        .nest("/api/v1", features::router(state))
        // Applied innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Report whether the store is reachable
async fn health_check(State(store): State<SharedStore>) -> Response {
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "store": store.backend()
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, backend = store.backend(), "Store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "store": store.backend()
                })),
            )
                .into_response()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{get_request, send, TestApp};

    #[tokio::test]
    async fn test_health_reports_backend() {
        let app = TestApp::new();
        let router = create_router(app.state.clone(), &Config::default());

        let (status, body) = send(router, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy", "store": "memory"}));
    }

    #[tokio::test]
    async fn test_features_are_versioned() {
        let app = TestApp::new();
        let router = create_router(app.state.clone(), &Config::default());

        let (status, body) = send(router.clone(), get_request("/api/v1/datasets")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = send(router, get_request("/datasets")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
