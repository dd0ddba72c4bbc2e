//! Health check endpoint handlers.
//!
//! These routes sit outside the tenant middleware: probes have no tenant
//! and must never need one.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::ApiResult;
use crate::state::AppState;

/// Handler for the health check endpoint.
///
/// Returns a simple health status, useful for load balancers and
/// monitoring systems.
///
/// # HTTP Request
///
/// `GET [base]/health`
///
/// # Response
///
/// - `200 OK` - Server is healthy
/// - `503 Service Unavailable` - Server is unhealthy
pub async fn health_handler(State(state): State<AppState>) -> ApiResult<Response> {
    debug!("Processing health check request");

    let backend_name = state.store().backend().name();

    let health_response = serde_json::json!({
        "status": "healthy",
        "backend": backend_name,
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    Ok((StatusCode::OK, Json(health_response)).into_response())
}

/// Handler for a liveness probe.
///
/// This could be used by Kubernetes liveness probes.
///
/// # HTTP Request
///
/// `GET [base]/_liveness`
pub async fn liveness_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Handler for a readiness probe.
///
/// # HTTP Request
///
/// `GET [base]/_readiness`
pub async fn readiness_handler(State(state): State<AppState>) -> ApiResult<Response> {
    debug!("Processing readiness check request");

    let backend_name = state.store().backend().name();

    let response = serde_json::json!({
        "status": "ready",
        "backend": backend_name,
        "checks": {
            "storage": "ok"
        }
    });

    Ok((StatusCode::OK, Json(response)).into_response())
}
