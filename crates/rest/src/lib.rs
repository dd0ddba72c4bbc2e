//! # castellan-rest - HTTP API for the Castellan isolation core
//!
//! This crate exposes the tenant-isolation and entitlement-enforcement core
//! over HTTP. Every tenant-facing route passes through fail-closed context
//! resolution before a handler runs; storage is only reachable through the
//! tenant-scoped store, identifier shapes are validated by the attack
//! detector, and metered operations consult the entitlement engine.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use castellan_core::audit::InMemoryAuditSink;
//! use castellan_core::store::SqliteStore;
//! use castellan_rest::{AppState, ServerConfig, create_app};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = Arc::new(SqliteStore::in_memory()?);
//!     let sink = Arc::new(InMemoryAuditSink::new());
//!     let state = AppState::new(backend, sink, ServerConfig::default());
//!
//!     let app = create_app(state);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Operation | HTTP Method | URL Pattern |
//! |-----------|-------------|-------------|
//! | list | GET | `/collections/{collection}` |
//! | create | POST | `/collections/{collection}` |
//! | read | GET | `/collections/{collection}/{id}` |
//! | patch | PATCH | `/collections/{collection}/{id}` |
//! | delete | DELETE | `/collections/{collection}/{id}` |
//! | bulk read | POST | `/collections/{collection}/_batch` |
//! | export | POST | `/collections/{collection}/export` |
//! | usage | GET | `/usage` |
//! | plan | GET | `/plan` |
//! | health | GET | `/health` |
//!
//! ## HTTP Headers
//!
//! - `X-Tenant-ID` - The claimed tenant; mandatory on tenant-scoped routes
//! - `X-User-ID` - The authenticated user, set by the identity layer
//! - `X-Correlation-ID` - Optional caller-supplied correlation identifier
//!
//! ## Error Handling
//!
//! Errors map to deterministic statuses with sanitized bodies:
//!
//! | HTTP Status | Code | Description |
//! |-------------|------|-------------|
//! | 400 | INVALID_RESOURCE_ID_FORMAT, ... | Malformed identifier or batch |
//! | 401 | TENANT_CONTEXT_REQUIRED, INVALID_TENANT_ID | No usable tenant claim |
//! | 403 | TENANT_MEMBERSHIP_INVALID | Caller not a member of the tenant |
//! | 403 | ENTITLEMENT_HARD_LIMIT, ... | Denied entitlement decision |
//! | 404 | NOT_FOUND | Missing or foreign resource, indistinguishable |
//! | 429 | RATE_LIMITED | Validation-attempt budget exceeded |
//! | 500 | OPERATION_FAILED | Internal failure, detail in logs only |
//!
//! ## Architecture
//!
//! - [`error`] - Error types and status mapping
//! - [`config`] - Server configuration
//! - [`state`] - Application state (wired pipeline, configuration)
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Tenant context resolution
//! - [`routing`] - Route configuration

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application over a wired [`AppState`].
///
/// This function sets up the complete REST API with all handlers,
/// middleware, and the configuration carried by the state.
///
/// # Example
///
/// ```rust,ignore
/// use castellan_rest::{AppState, ServerConfig, create_app};
///
/// let state = AppState::new(backend, sink, ServerConfig::default());
/// let app = create_app(state);
/// ```
pub fn create_app(state: AppState) -> Router {
    info!(
        "Creating REST API server with backend: {}",
        state.store().backend().name()
    );

    let config = state.config().clone();

    // Build the router with all routes
    let router = routing::create_routes(state);

    // Build middleware stack
    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(config.request_timeout),
        ));

    // Add CORS if enabled
    let router = if config.enable_cors {
        let cors = build_cors_layer(&config);
        router.layer(cors)
    } else {
        router
    };

    // Apply remaining middleware
    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    // Configure origins
    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    // Configure methods
    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    // Configure headers
    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "castellan_rest={level},castellan_core={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
