//! Store-backed tenant and membership lookup.

use std::sync::Arc;

use async_trait::async_trait;

use super::id::TenantId;
use super::membership::{Membership, MembershipDirectory, Tenant};
use crate::error::StoreResult;
use crate::store::{Condition, DataStore, Filter};

/// [`MembershipDirectory`] reading from the `tenants` and `memberships`
/// collections of a data store.
///
/// Lookups here run unscoped by necessity: they happen while the tenant
/// context is still being established.
pub struct StoreMembershipDirectory {
    store: Arc<dyn DataStore>,
}

impl StoreMembershipDirectory {
    /// Collection the tenant rows live in.
    pub const TENANTS: &'static str = "tenants";

    /// Collection the membership rows live in.
    pub const MEMBERSHIPS: &'static str = "memberships";

    /// Creates a directory over the given store.
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MembershipDirectory for StoreMembershipDirectory {
    async fn find_membership(
        &self,
        user_id: &str,
        tenant_id: &TenantId,
    ) -> StoreResult<Option<Membership>> {
        let filter = Filter::new()
            .and(Condition::eq("user_id", user_id))
            .and(Condition::eq("tenant_id", tenant_id.as_str()));
        let row = self.store.find_one(Self::MEMBERSHIPS, &filter).await?;
        match row {
            Some(record) => {
                let mut membership: Membership = serde_json::from_value(record.content)?;
                membership.tenant_id = record.tenant_id;
                Ok(Some(membership))
            }
            None => Ok(None),
        }
    }

    async fn find_tenant(&self, tenant_id: &TenantId) -> StoreResult<Option<Tenant>> {
        let row = self
            .store
            .find_one(Self::TENANTS, &Filter::by("id", tenant_id.as_str()))
            .await?;
        match row {
            Some(record) => {
                let mut tenant: Tenant = serde_json::from_value(record.content)?;
                tenant.id = record.tenant_id;
                Ok(Some(tenant))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Record};
    use crate::tenant::Role;

    #[tokio::test]
    async fn test_membership_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let tenant = Tenant::provision("Acme");
        let membership = Membership::new("alice", tenant.id.clone(), Role::Admin);

        store
            .insert(Record::new(
                StoreMembershipDirectory::TENANTS,
                tenant.id.as_str(),
                tenant.id.clone(),
                serde_json::to_value(&tenant).unwrap(),
            ))
            .await
            .unwrap();
        store
            .insert(Record::new(
                StoreMembershipDirectory::MEMBERSHIPS,
                format!("{}:{}", membership.user_id, tenant.id),
                tenant.id.clone(),
                serde_json::to_value(&membership).unwrap(),
            ))
            .await
            .unwrap();

        let directory = StoreMembershipDirectory::new(store);
        let found = directory
            .find_membership("alice", &tenant.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.role, Role::Admin);
        assert_eq!(&found.tenant_id, &tenant.id);

        let found_tenant = directory.find_tenant(&tenant.id).await.unwrap().unwrap();
        assert!(found_tenant.is_usable());

        assert!(
            directory
                .find_membership("mallory", &tenant.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unknown_tenant_is_none() {
        let directory = StoreMembershipDirectory::new(Arc::new(MemoryStore::new()));
        assert!(
            directory
                .find_tenant(&TenantId::generate())
                .await
                .unwrap()
                .is_none()
        );
    }
}
