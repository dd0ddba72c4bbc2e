//! HTTP request handlers.

pub mod export;
pub mod health;
pub mod plan;
pub mod records;
pub mod usage;

use axum::{Json, http::StatusCode, response::Response};
use axum::response::IntoResponse;
use serde_json::{Value, json};

use castellan_core::entitlement::EntitlementDecision;
use castellan_core::guard::sanitize::SAFE_ACCESS_DENIED;
use castellan_core::store::Record;

/// Renders a stored record for an API response.
///
/// The tenant column is deliberately absent: responses never echo tenant
/// identifiers, not even the caller's own.
pub(crate) fn render(record: &Record) -> Value {
    json!({
        "id": record.id,
        "collection": record.collection,
        "content": record.content,
        "created_at": record.created_at,
        "updated_at": record.updated_at,
    })
}

/// Builds the 403 response for a denied entitlement decision.
///
/// A denial is an outcome, not an error; the body carries the full decision
/// so clients can render limits and upgrade prompts.
pub(crate) fn entitlement_denied(decision: &EntitlementDecision) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": {
                "code": decision.reason,
                "message": SAFE_ACCESS_DENIED,
            },
            "decision": decision,
        })),
    )
        .into_response()
}
