//! Relay API handlers

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::api::models::{ApiError, RelayRequest, RelayResponse};
use crate::error::RelayError;
use crate::metrics::METRICS;
use crate::relay::RelayService;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayService>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn error_response(err: &RelayError) -> (StatusCode, Json<ApiError>) {
    (err.status_code(), Json(ApiError::new(err.to_string())))
}

/// Chat or summarize, depending on `mode`
///
/// POST /
/// POST /api/v1/relay
pub async fn relay(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<RelayResponse> {
    let start = Instant::now();

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            METRICS.record_request("invalid", false, start.elapsed().as_secs_f64());
            return Err((
                rejection.status(),
                Json(ApiError::new(rejection.body_text())),
            ));
        }
    };

    // The body is parsed by hand so a missing content type is not an error
    let request: RelayRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected malformed request body: {}", e);
            METRICS.record_request("invalid", false, start.elapsed().as_secs_f64());
            return Err(error_response(&RelayError::validation(format!(
                "Invalid request body: {}",
                e
            ))));
        }
    };

    let mode = request.mode.as_str();
    let span = info_span!("relay", request_id = %Uuid::new_v4(), mode);
    let result = async {
        info!(
            "Relay request: {} history messages, summary={}",
            request.messages.len(),
            request.summary.is_some() || request.old_summary.is_some()
        );
        state.relay.handle(request).await
    }
    .instrument(span)
    .await;

    METRICS.record_request(mode, result.is_ok(), start.elapsed().as_secs_f64());

    match result {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            match &e {
                RelayError::Validation(_) => warn!("Relay request rejected: {}", e),
                _ => error!("Relay request failed: {}", e),
            }
            Err(error_response(&e))
        }
    }
}

/// Any method other than POST on the relay routes
pub async fn method_not_allowed() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiError::new("Method Not Allowed")),
    )
}

/// Rewrite the plain-text 413 of the body limit layer as a JSON error
pub async fn json_payload_too_large(response: Response) -> Response {
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response;
    }
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if is_json {
        return response;
    }
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(ApiError::new("Request body exceeds the configured size limit")),
    )
        .into_response()
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export_prometheus(),
    )
}
