//! Subscriptions and current-tier resolution.
//!
//! A tenant with no subscription at all is on the FREE tier. That default
//! is deliberate and is distinct from the fail-closed rule on tenant
//! identity: identity has no default, billing does.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tier::PlanTier;
use crate::error::StoreResult;
use crate::store::{DataStore, Filter};
use crate::tenant::TenantId;

/// Lifecycle status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// In a trial window.
    Trialing,
    /// Paid and current.
    Active,
    /// Payment failed but the grace window has not closed.
    PastDue,
    /// Terminated.
    Canceled,
}

impl SubscriptionStatus {
    /// Returns `true` if the status still entitles the tenant to the plan.
    ///
    /// Past-due counts: billing grace must not revoke entitlements before
    /// dunning completes.
    pub fn is_active_like(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Trialing | SubscriptionStatus::Active | SubscriptionStatus::PastDue
        )
    }
}

/// A tenant's link to a plan tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription identifier.
    pub id: String,
    /// The subscribed tenant.
    pub tenant_id: TenantId,
    /// The plan tier.
    pub tier: PlanTier,
    /// Lifecycle status.
    pub status: SubscriptionStatus,
    /// Start of the validity window.
    pub started_at: DateTime<Utc>,
    /// End of the validity window, if bounded.
    pub ends_at: Option<DateTime<Utc>>,
    /// Soft-delete timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Returns `true` if the subscription entitles the tenant right now.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.deleted_at.is_none()
            && self.status.is_active_like()
            && self.started_at <= now
            && self.ends_at.is_none_or(|end| now < end)
    }
}

/// Derives the current tier from a tenant's subscriptions.
///
/// The most recently started current subscription wins; no subscription at
/// all means FREE.
pub fn current_tier(subscriptions: &[Subscription], now: DateTime<Utc>) -> PlanTier {
    subscriptions
        .iter()
        .filter(|s| s.is_current(now))
        .max_by_key(|s| s.started_at)
        .map(|s| s.tier)
        .unwrap_or(PlanTier::Free)
}

/// Source of a tenant's subscription rows.
#[async_trait]
pub trait SubscriptionDirectory: Send + Sync {
    /// Returns all subscriptions for a tenant, deleted ones included.
    async fn subscriptions_for(&self, tenant_id: &TenantId) -> StoreResult<Vec<Subscription>>;
}

/// [`SubscriptionDirectory`] reading from the `subscriptions` collection of
/// a data store.
pub struct StoreSubscriptionDirectory {
    store: Arc<dyn DataStore>,
}

impl StoreSubscriptionDirectory {
    /// Collection the subscription rows live in.
    pub const COLLECTION: &'static str = "subscriptions";

    /// Creates a directory over the given store.
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SubscriptionDirectory for StoreSubscriptionDirectory {
    async fn subscriptions_for(&self, tenant_id: &TenantId) -> StoreResult<Vec<Subscription>> {
        let rows = self
            .store
            .find_many(
                Self::COLLECTION,
                &Filter::by("tenant_id", tenant_id.as_str()),
                None,
            )
            .await?;
        let mut subscriptions = Vec::with_capacity(rows.len());
        for row in rows {
            let mut subscription: Subscription = serde_json::from_value(row.content)?;
            subscription.tenant_id = row.tenant_id;
            subscription.id = row.id;
            subscriptions.push(subscription);
        }
        Ok(subscriptions)
    }
}
