//! Tenant context middleware.
//!
//! Extracts the tenant claim from request headers and resolves it through
//! the fail-closed resolver before any handler runs. There is no default
//! tenant: a request that cannot be resolved is rejected here and never
//! reaches storage.

use axum::{
    extract::{Request, State},
    http::header::HeaderName,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use castellan_core::error::ContextError;
use castellan_core::tenant::{TenantClaim, TenantContext};

use crate::error::ApiError;
use crate::state::AppState;

/// Header name for tenant identification.
pub static X_TENANT_ID: HeaderName = HeaderName::from_static("x-tenant-id");

/// Header name for the authenticated user.
///
/// Stands in for the identity layer; in production deployments the value is
/// set by the authenticating proxy, never by the client directly.
pub static X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

/// Header name for the caller-supplied correlation identifier.
pub static X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

fn header_value(request: &Request, name: &HeaderName) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Builds the unvalidated claim carried by a request's headers.
pub fn claim_from_request(request: &Request) -> Result<TenantClaim, ApiError> {
    // No authenticated user means no context at all.
    let user_id = header_value(request, &X_USER_ID)
        .filter(|v| !v.is_empty())
        .ok_or(ContextError::TenantContextRequired)
        .map_err(castellan_core::CoreError::from)?;

    Ok(TenantClaim {
        claimed_tenant: header_value(request, &X_TENANT_ID),
        user_id,
        correlation_id: header_value(request, &X_CORRELATION_ID),
    })
}

/// Middleware resolving the tenant context for every request.
///
/// On success the validated [`TenantContext`] is inserted as a request
/// extension for handlers to take. Use with
/// `axum::middleware::from_fn_with_state`.
pub async fn resolve_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claim = claim_from_request(&request)?;
    let ctx: TenantContext = state.resolver().resolve(&claim).await?;

    debug!(
        tenant_id = %ctx.tenant_id(),
        request_id = %ctx.request_id(),
        "tenant context attached"
    );
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
