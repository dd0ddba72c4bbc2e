//! Route configuration for the Castellan REST API.
//!
//! Tenant-facing routes are nested under the context-resolution middleware;
//! health probes stay outside it.

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};

use crate::handlers;
use crate::middleware::tenant::resolve_context;
use crate::state::AppState;

/// Creates all REST API routes.
///
/// # Routes
///
/// ## Probes (no tenant context)
/// - `GET /health` - Health check
/// - `GET /_liveness` - Liveness probe
/// - `GET /_readiness` - Readiness probe
///
/// ## Tenant-scoped
/// - `GET /collections/{collection}` - List
/// - `POST /collections/{collection}` - Create
/// - `GET /collections/{collection}/{id}` - Read
/// - `PATCH /collections/{collection}/{id}` - Patch
/// - `DELETE /collections/{collection}/{id}` - Delete
/// - `POST /collections/{collection}/_batch` - Bulk read
/// - `POST /collections/{collection}/export` - Metered export
/// - `GET /usage` - Usage counters for the current period
/// - `GET /plan` - Current tier and entitlements
pub fn create_routes(state: AppState) -> Router {
    let scoped = Router::new()
        .route("/collections/{collection}", get(handlers::records::list_records))
        .route("/collections/{collection}", post(handlers::records::create_record))
        .route(
            "/collections/{collection}/_batch",
            post(handlers::records::batch_get_records),
        )
        .route(
            "/collections/{collection}/export",
            post(handlers::export::export_records),
        )
        .route(
            "/collections/{collection}/{id}",
            get(handlers::records::get_record),
        )
        .route(
            "/collections/{collection}/{id}",
            patch(handlers::records::update_record),
        )
        .route(
            "/collections/{collection}/{id}",
            delete(handlers::records::delete_record),
        )
        .route("/usage", get(handlers::usage::get_usage))
        .route("/plan", get(handlers::plan::get_plan))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            resolve_context,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/_liveness", get(handlers::health::liveness_handler))
        .route("/_readiness", get(handlers::health::readiness_handler))
        .merge(scoped)
        .with_state(state)
}
