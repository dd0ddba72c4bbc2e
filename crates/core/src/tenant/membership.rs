//! Tenant and membership records.
//!
//! A [`Tenant`] is created once at provisioning and never mutated except for
//! activation, deactivation, and soft deletion. A [`Membership`] links an
//! authenticated user to a tenant with a role and governs which tenant
//! contexts that user may assume. The [`MembershipDirectory`] trait is the
//! seam through which the resolver looks memberships up.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::TenantId;
use crate::error::StoreResult;

/// An isolated customer account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// The immutable tenant identifier.
    pub id: TenantId,
    /// Display name shown in dashboards.
    pub display_name: String,
    /// Whether the tenant is active.
    pub active: bool,
    /// Soft-delete timestamp; `Some` means the tenant is deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tenant {
    /// Creates a new active tenant with a freshly generated identifier.
    pub fn provision(display_name: impl Into<String>) -> Self {
        Self {
            id: TenantId::generate(),
            display_name: display_name.into(),
            active: true,
            deleted_at: None,
        }
    }

    /// Returns `true` if the tenant is active and not soft-deleted.
    pub fn is_usable(&self) -> bool {
        self.active && self.deleted_at.is_none()
    }
}

/// Role a user holds within a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full administrative control over the tenant.
    Owner,
    /// Manage members and settings.
    Admin,
    /// Ordinary read/write access.
    Member,
    /// Read-only access.
    Viewer,
}

/// The relation granting a user access to a tenant.
///
/// Unique per `(user_id, tenant_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// The authenticated user.
    pub user_id: String,
    /// The tenant the user belongs to.
    pub tenant_id: TenantId,
    /// The user's role within the tenant.
    pub role: Role,
    /// Whether the membership is active.
    pub active: bool,
}

impl Membership {
    /// Creates a new active membership.
    pub fn new(user_id: impl Into<String>, tenant_id: TenantId, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id,
            role,
            active: true,
        }
    }
}

/// Lookup seam for tenants and memberships.
///
/// The resolver depends on this trait rather than on a concrete store so
/// tests can construct a fresh in-memory directory per case.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// Looks up the membership row for `(user_id, tenant_id)`, if any.
    async fn find_membership(
        &self,
        user_id: &str,
        tenant_id: &TenantId,
    ) -> StoreResult<Option<Membership>>;

    /// Looks up the tenant record, if any.
    async fn find_tenant(&self, tenant_id: &TenantId) -> StoreResult<Option<Tenant>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioned_tenant_is_usable() {
        let tenant = Tenant::provision("Acme");
        assert!(tenant.is_usable());
        assert_eq!(tenant.display_name, "Acme");
    }

    #[test]
    fn test_deactivated_tenant_is_not_usable() {
        let mut tenant = Tenant::provision("Acme");
        tenant.active = false;
        assert!(!tenant.is_usable());
    }

    #[test]
    fn test_soft_deleted_tenant_is_not_usable() {
        let mut tenant = Tenant::provision("Acme");
        tenant.deleted_at = Some(Utc::now());
        assert!(!tenant.is_usable());
    }

    #[test]
    fn test_membership_defaults_active() {
        let membership = Membership::new("user-1", TenantId::generate(), Role::Member);
        assert!(membership.active);
        assert_eq!(membership.role, Role::Member);
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
    }
}
