//! Tenant context for request-scoped operations.
//!
//! This module defines [`TenantContext`], the validated, immutable value
//! object that every downstream component takes as an explicit input
//! parameter. There is no ambient "current tenant" global: concurrent
//! requests for different tenants each carry their own context.

use serde::Serialize;

use super::id::TenantId;

/// A validated, request-scoped tenant context.
///
/// A `TenantContext` is constructed exactly once per request by the
/// [`ContextResolver`](super::resolver::ContextResolver), never mutated, and
/// discarded at request end. Holding one is proof that the tenant identifier
/// was well-formed and that an active membership linked the caller to the
/// tenant at resolution time.
///
/// # Design
///
/// Every core operation takes a `&TenantContext` parameter rather than
/// reading shared state. This makes tenant isolation a type-level property:
/// forgetting to pass the context is a compile error, and two concurrent
/// requests can never interleave tenant identity.
#[derive(Debug, Clone, Serialize)]
pub struct TenantContext {
    tenant_id: TenantId,
    user_id: String,
    request_id: String,
    correlation_id: String,
}

impl TenantContext {
    /// Creates a new tenant context.
    ///
    /// Only the resolver (and tests) should call this; handlers receive an
    /// already-resolved context.
    pub fn new(
        tenant_id: TenantId,
        user_id: impl Into<String>,
        request_id: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            user_id: user_id.into(),
            request_id: request_id.into(),
            correlation_id: correlation_id.into(),
        }
    }

    /// Returns the tenant identifier.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the authenticated user identifier.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the per-request identifier.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the correlation identifier for tracing across services.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}
