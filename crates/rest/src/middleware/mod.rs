//! Axum middleware for the Castellan REST API.

pub mod tenant;

pub use tenant::{X_CORRELATION_ID, X_TENANT_ID, X_USER_ID, resolve_context};
