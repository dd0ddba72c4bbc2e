//! Fail-closed tenant context resolution.
//!
//! The [`ContextResolver`] turns a claimed tenant identifier and an
//! authenticated user into a validated [`TenantContext`], or fails. The
//! claim must come from a dedicated request channel (header or token claim),
//! never from a request body the client fully controls.
//!
//! Resolution fails closed at every step: a missing claim is
//! `TENANT_CONTEXT_REQUIRED`, a malformed claim is `INVALID_TENANT_ID`, and
//! an absent or inactive membership (or an unusable tenant) is
//! `TENANT_MEMBERSHIP_INVALID`. There is no default tenant under any
//! circumstance.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::context::TenantContext;
use super::id::TenantId;
use super::membership::MembershipDirectory;
use crate::audit::{AuditAction, AuditEmitter, AuditOutcome, SecurityEvent, Severity};
use crate::error::{ContextError, CoreError, CoreResult};

/// The claim a request arrives with, before validation.
///
/// Produced by the transport layer (HTTP header, JWT claim); consumed only
/// by [`ContextResolver::resolve`].
#[derive(Debug, Clone)]
pub struct TenantClaim {
    /// The raw claimed tenant identifier, if any was supplied.
    pub claimed_tenant: Option<String>,
    /// The authenticated user, as established by the identity provider.
    pub user_id: String,
    /// Correlation identifier propagated from the caller, if any.
    pub correlation_id: Option<String>,
}

/// Resolves tenant claims into validated contexts.
///
/// Explicitly constructed and dependency-injected; holds no global state.
pub struct ContextResolver {
    directory: Arc<dyn MembershipDirectory>,
    audit: AuditEmitter,
}

impl ContextResolver {
    /// Creates a resolver over the given membership directory.
    pub fn new(directory: Arc<dyn MembershipDirectory>, audit: AuditEmitter) -> Self {
        Self { directory, audit }
    }

    /// Resolves a claim into a validated [`TenantContext`].
    ///
    /// Validation order is fixed: format first (cheap, no I/O), then the
    /// membership and tenant lookups. The format check always runs before
    /// any other processing so malformed identifiers never reach storage.
    ///
    /// # Errors
    ///
    /// * [`ContextError::TenantContextRequired`] - no tenant claim supplied
    /// * [`ContextError::InvalidTenantId`] - claim fails the format check
    /// * [`ContextError::MembershipInvalid`] - no active membership for the
    ///   caller, or the tenant is inactive or soft-deleted
    pub async fn resolve(&self, claim: &TenantClaim) -> CoreResult<TenantContext> {
        let request_id = Uuid::new_v4().to_string();
        let correlation_id = claim
            .correlation_id
            .clone()
            .unwrap_or_else(|| request_id.clone());

        let raw = match claim.claimed_tenant.as_deref() {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                self.reject(claim, &correlation_id, ContextError::TenantContextRequired);
                return Err(ContextError::TenantContextRequired.into());
            }
        };

        let tenant_id = match TenantId::parse(raw) {
            Ok(id) => id,
            Err(e) => {
                self.reject(claim, &correlation_id, e.clone());
                return Err(e.into());
            }
        };

        let membership = self
            .directory
            .find_membership(&claim.user_id, &tenant_id)
            .await
            .map_err(CoreError::Store)?;

        let membership_ok = membership.map(|m| m.active).unwrap_or(false);
        if !membership_ok {
            self.reject(claim, &correlation_id, ContextError::MembershipInvalid);
            return Err(ContextError::MembershipInvalid.into());
        }

        let tenant_ok = self
            .directory
            .find_tenant(&tenant_id)
            .await
            .map_err(CoreError::Store)?
            .map(|t| t.is_usable())
            .unwrap_or(false);
        if !tenant_ok {
            self.reject(claim, &correlation_id, ContextError::MembershipInvalid);
            return Err(ContextError::MembershipInvalid.into());
        }

        debug!(
            tenant_id = %tenant_id,
            user_id = %claim.user_id,
            request_id = %request_id,
            "tenant context resolved"
        );

        self.audit.emit(
            SecurityEvent::new(
                AuditAction::ContextResolved,
                AuditOutcome::Granted,
                Severity::Debug,
            )
            .tenant(tenant_id.clone())
            .actor(claim.user_id.clone())
            .correlation(correlation_id.clone()),
        );

        Ok(TenantContext::new(
            tenant_id,
            claim.user_id.clone(),
            request_id,
            correlation_id,
        ))
    }

    fn reject(&self, claim: &TenantClaim, correlation_id: &str, error: ContextError) {
        self.audit.emit(
            SecurityEvent::new(
                AuditAction::ContextRejected,
                AuditOutcome::Denied,
                Severity::Warning,
            )
            .actor(claim.user_id.clone())
            .correlation(correlation_id.to_string())
            .metadata(json!({
                "code": error.code(),
                "claimed_tenant": claim.claimed_tenant,
            })),
        );
    }
}
