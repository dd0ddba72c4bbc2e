//! Decision cache.
//!
//! A process-local concurrent map keyed by a hash of (tenant, user, action,
//! requested quantity, tier) with a short TTL. The quantity is part of the
//! key because a metered decision is only valid for the projection it was
//! computed against; a grant for one unit must never answer a request for
//! two. Entries are invalidated explicitly when a tenant's plan changes and
//! expire passively otherwise; a background sweep evicts what expiry alone
//! would leave behind.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use super::decision::EntitlementDecision;
use crate::plan::PlanTier;
use crate::tenant::TenantId;

struct CachedDecision {
    tenant: String,
    decision: EntitlementDecision,
    expires_at: Instant,
}

/// TTL cache of entitlement decisions.
pub struct DecisionCache {
    entries: DashMap<String, CachedDecision>,
    ttl: Duration,
}

impl DecisionCache {
    /// Creates a cache with the given TTL. Minutes, not hours.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn key(
        tenant_id: &TenantId,
        user_id: &str,
        action: &str,
        requested: u64,
        tier: PlanTier,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(tenant_id.as_str());
        hasher.update([0]);
        hasher.update(user_id);
        hasher.update([0]);
        hasher.update(action);
        hasher.update([0]);
        hasher.update(requested.to_be_bytes());
        hasher.update([0]);
        hasher.update(tier.as_str());
        format!("{:x}", hasher.finalize())
    }

    /// Returns a live cached decision, if any.
    pub fn get(
        &self,
        tenant_id: &TenantId,
        user_id: &str,
        action: &str,
        requested: u64,
        tier: PlanTier,
    ) -> Option<EntitlementDecision> {
        let key = Self::key(tenant_id, user_id, action, requested, tier);
        let entry = self.entries.get(&key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(&key);
            return None;
        }
        Some(entry.decision.clone())
    }

    /// Caches a decision.
    pub fn insert(
        &self,
        tenant_id: &TenantId,
        user_id: &str,
        action: &str,
        requested: u64,
        tier: PlanTier,
        decision: EntitlementDecision,
    ) {
        let key = Self::key(tenant_id, user_id, action, requested, tier);
        self.entries.insert(
            key,
            CachedDecision {
                tenant: tenant_id.as_str().to_string(),
                decision,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drops every cached decision for a tenant. Called on plan changes.
    pub fn invalidate_tenant(&self, tenant_id: &TenantId) {
        self.entries
            .retain(|_, cached| cached.tenant != tenant_id.as_str());
    }

    /// Evicts expired entries.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.entries.retain(|_, cached| cached.expires_at > now);
    }

    /// Number of live entries, for tests and diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
