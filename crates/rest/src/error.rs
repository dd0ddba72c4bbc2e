//! Error types for the HTTP API.
//!
//! Core errors are mapped to deterministic HTTP statuses with sanitized
//! bodies:
//!
//! | Core error | HTTP status | Body code |
//! |------------|-------------|-----------|
//! | TenantContextRequired / InvalidTenantId | 401 | as-is |
//! | MembershipInvalid | 403 | TENANT_MEMBERSHIP_INVALID |
//! | Guard: NotFound (missing or foreign) | 404 | NOT_FOUND |
//! | Guard: AccessDenied | 403 | ACCESS_DENIED |
//! | Guard: RateLimited | 429 | RATE_LIMITED |
//! | Guard: format / enumeration / batch | 400 | as-is |
//! | Isolation violation | 500 | OPERATION_FAILED |
//! | Store failure | 500 | OPERATION_FAILED |
//!
//! Not-found and foreign-tenant both map to 404, never 403, so responses
//! carry no existence signal. Entitlement denials are not errors; handlers
//! turn those decisions into 403 responses themselves.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use castellan_core::error::{ContextError, CoreError, GuardError};
use castellan_core::guard::sanitize::{
    SAFE_ACCESS_DENIED, SAFE_NOT_FOUND, SAFE_OPERATION_FAILED,
};

/// The primary error type for API operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A core isolation/entitlement error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Malformed request (bad JSON shape, invalid query parameter).
    #[error("bad request: {message}")]
    BadRequest {
        /// Internal detail; never sent to the client.
        message: String,
    },
}

impl ApiError {
    fn status_code_and_body(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            ApiError::Core(CoreError::Context(e)) => match e {
                ContextError::TenantContextRequired | ContextError::InvalidTenantId => {
                    (StatusCode::UNAUTHORIZED, e.code(), SAFE_ACCESS_DENIED)
                }
                ContextError::MembershipInvalid => {
                    (StatusCode::FORBIDDEN, e.code(), SAFE_ACCESS_DENIED)
                }
            },
            ApiError::Core(CoreError::Guard(e)) => match e {
                GuardError::NotFound => (StatusCode::NOT_FOUND, e.code(), SAFE_NOT_FOUND),
                GuardError::AccessDenied => (StatusCode::FORBIDDEN, e.code(), SAFE_ACCESS_DENIED),
                GuardError::RateLimited => {
                    (StatusCode::TOO_MANY_REQUESTS, e.code(), SAFE_ACCESS_DENIED)
                }
                GuardError::InvalidResourceIdFormat
                | GuardError::SuspectedEnumeration
                | GuardError::BatchTooLarge { .. }
                | GuardError::SequentialBatch => {
                    (StatusCode::BAD_REQUEST, e.code(), SAFE_ACCESS_DENIED)
                }
            },
            ApiError::Core(CoreError::Isolation(_)) | ApiError::Core(CoreError::Store(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "OPERATION_FAILED",
                SAFE_OPERATION_FAILED,
            ),
            ApiError::BadRequest { .. } => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", SAFE_OPERATION_FAILED)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.status_code_and_body();

        // Internal detail goes to the log, not the body.
        if status.is_server_error() {
            error!(error = %self, code, "request failed");
        } else {
            warn!(error = %self, code, "request rejected");
        }

        let body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
