//! Per-tenant usage counters.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::period::BillingPeriod;
use crate::error::StoreResult;
use crate::plan::Metric;
use crate::store::DataStore;
use crate::tenant::TenantId;

/// A read of all tracked metrics for one tenant in one period.
///
/// Untracked metrics read as zero rather than being an error; a tenant that
/// has never exported anything simply has no exports row yet.
#[derive(Debug, Clone)]
pub struct UsageSnapshot {
    /// The period the snapshot covers.
    pub period: BillingPeriod,
    counters: HashMap<String, u64>,
}

impl UsageSnapshot {
    /// Current usage for a metric, zero when untracked.
    pub fn get(&self, metric: Metric) -> u64 {
        self.counters.get(metric.as_str()).copied().unwrap_or(0)
    }

    /// All tracked metrics with their totals.
    pub fn tracked(&self) -> &HashMap<String, u64> {
        &self.counters
    }
}

/// Atomically reads and increments usage counters scoped to the current
/// billing period.
#[async_trait]
pub trait UsageMeter: Send + Sync {
    /// Adds `quantity` to a tenant's counter for the current period and
    /// returns the new total.
    async fn add(&self, tenant_id: &TenantId, metric: Metric, quantity: u64) -> StoreResult<u64>;

    /// Reads the tenant's counters for the current period.
    async fn snapshot(&self, tenant_id: &TenantId) -> StoreResult<UsageSnapshot>;
}

/// [`UsageMeter`] backed by a data store's atomic counter primitive.
///
/// The upsert-and-add happens inside the store engine, so concurrent
/// increments for the same (tenant, metric) never lose updates.
pub struct StoreUsageMeter {
    store: Arc<dyn DataStore>,
}

impl StoreUsageMeter {
    /// Creates a meter over the given store.
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UsageMeter for StoreUsageMeter {
    async fn add(&self, tenant_id: &TenantId, metric: Metric, quantity: u64) -> StoreResult<u64> {
        let period = BillingPeriod::current();
        let total = self
            .store
            .add_to_counter(tenant_id, metric.as_str(), &period.key(), quantity)
            .await?;
        debug!(
            tenant_id = %tenant_id,
            metric = metric.as_str(),
            period = %period.key(),
            total,
            "usage incremented"
        );
        Ok(total)
    }

    async fn snapshot(&self, tenant_id: &TenantId) -> StoreResult<UsageSnapshot> {
        let period = BillingPeriod::current();
        let counters = self
            .store
            .counters_for_period(tenant_id, &period.key())
            .await?;
        Ok(UsageSnapshot { period, counters })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_add_and_snapshot() {
        let meter = StoreUsageMeter::new(Arc::new(MemoryStore::new()));
        let tenant = TenantId::generate();

        assert_eq!(meter.add(&tenant, Metric::ExportsPerMonth, 3).await.unwrap(), 3);
        assert_eq!(meter.add(&tenant, Metric::ExportsPerMonth, 2).await.unwrap(), 5);

        let snapshot = meter.snapshot(&tenant).await.unwrap();
        assert_eq!(snapshot.get(Metric::ExportsPerMonth), 5);
        // Untracked metrics default to zero.
        assert_eq!(snapshot.get(Metric::Users), 0);
    }

    #[tokio::test]
    async fn test_tenants_do_not_share_counters() {
        let meter = StoreUsageMeter::new(Arc::new(MemoryStore::new()));
        let tenant_a = TenantId::generate();
        let tenant_b = TenantId::generate();

        meter.add(&tenant_a, Metric::ApiCallsPerMonth, 10).await.unwrap();
        let snapshot = meter.snapshot(&tenant_b).await.unwrap();
        assert_eq!(snapshot.get(Metric::ApiCallsPerMonth), 0);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_lossless() {
        let meter = Arc::new(StoreUsageMeter::new(Arc::new(MemoryStore::new())));
        let tenant = TenantId::generate();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let meter = meter.clone();
            let tenant = tenant.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..10 {
                    meter.add(&tenant, Metric::ApiCallsPerMonth, 2).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = meter.snapshot(&tenant).await.unwrap();
        assert_eq!(snapshot.get(Metric::ApiCallsPerMonth), 400);
    }
}
