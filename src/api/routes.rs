//! Router construction

use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{self, AppState};
use crate::config::ServerConfig;

/// CORS policy for browser callers
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static("anthropic-version"),
        ])
        .max_age(Duration::from_secs(86_400))
}

/// Build the relay router
///
/// Oversized bodies are answered with a JSON `{ error }` like every other failure.
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", post(handlers::relay).fallback(handlers::method_not_allowed))
        .route(
            "/api/v1/relay",
            post(handlers::relay).fallback(handlers::method_not_allowed),
        )
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer())
                .layer(middleware::map_response(handlers::json_payload_too_large)),
        )
        .with_state(state)
}
