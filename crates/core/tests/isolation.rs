//! End-to-end properties of the isolation and entitlement core, exercised
//! through the public API with both adapters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use castellan_core::audit::{AuditEmitter, AuditSink, InMemoryAuditSink, SecurityEvent};
use castellan_core::entitlement::{
    EngineConfig, EntitlementAction, EntitlementEngine, REASON_HARD_LIMIT,
};
use castellan_core::error::{CoreError, StoreResult};
use castellan_core::guard::{AttackDetector, DetectorConfig};
use castellan_core::plan::{
    Metric, PlanRegistry, PlanTier, Subscription, SubscriptionDirectory, SubscriptionStatus,
};
use castellan_core::store::{DataStore, Filter, MemoryStore, Record, ScopedStore, SqliteStore};
use castellan_core::tenant::{
    ContextResolver, Membership, MembershipDirectory, Role, Tenant, TenantClaim, TenantContext,
    TenantId,
};
use castellan_core::usage::{StoreUsageMeter, UsageMeter};

fn audit() -> AuditEmitter {
    AuditEmitter::new(Arc::new(InMemoryAuditSink::new()))
}

fn context(tenant: &TenantId, user: &str) -> TenantContext {
    TenantContext::new(tenant.clone(), user, "req-1", "corr-1")
}

fn adapters() -> Vec<Arc<dyn DataStore>> {
    vec![
        Arc::new(MemoryStore::new()),
        Arc::new(SqliteStore::in_memory().expect("in-memory sqlite")),
    ]
}

// Isolation invariant: a context scoped to B can never reach A's rows,
// regardless of the filter supplied.
#[tokio::test]
async fn isolation_invariant_holds_for_every_adapter() {
    for backend in adapters() {
        let store = ScopedStore::new(backend, audit());
        let tenant_a = TenantId::generate();
        let tenant_b = TenantId::generate();
        let ctx_a = context(&tenant_a, "alice");
        let ctx_b = context(&tenant_b, "bob");

        let secret = store
            .create(&ctx_a, "documents", None, json!({"body": "confidential"}))
            .await
            .unwrap();

        // Read by id, read by hostile OR filter, update, delete: all as B.
        let by_id = store
            .find_one(&ctx_b, "documents", Filter::by("id", secret.id.clone()))
            .await
            .unwrap();
        assert!(by_id.is_none());

        let hostile = Filter::new()
            .or(Filter::by("tenant_id", tenant_a.as_str()))
            .or(Filter::by("body", "confidential"));
        let rows = store
            .find_many(&ctx_b, "documents", hostile, None)
            .await
            .unwrap();
        assert!(rows.is_empty());

        let touched = store
            .update(
                &ctx_b,
                "documents",
                Filter::by("id", secret.id.clone()),
                json!({"body": "defaced"}),
            )
            .await
            .unwrap();
        assert!(touched.is_empty());

        let deleted = store
            .delete(&ctx_b, "documents", Filter::by("id", secret.id.clone()))
            .await
            .unwrap();
        assert_eq!(deleted, 0);

        // A still sees the row intact.
        let intact = store
            .find_one(&ctx_a, "documents", Filter::by("id", secret.id.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(intact.content["body"], "confidential");
    }
}

struct SingleTenantDirectory {
    tenant: Tenant,
    membership: Membership,
}

#[async_trait]
impl MembershipDirectory for SingleTenantDirectory {
    async fn find_membership(
        &self,
        user_id: &str,
        tenant_id: &TenantId,
    ) -> StoreResult<Option<Membership>> {
        Ok((self.membership.user_id == user_id && &self.membership.tenant_id == tenant_id)
            .then(|| self.membership.clone()))
    }

    async fn find_tenant(&self, tenant_id: &TenantId) -> StoreResult<Option<Tenant>> {
        Ok((&self.tenant.id == tenant_id).then(|| self.tenant.clone()))
    }
}

// Fail-closed invariant: missing claim, malformed claim, or missing
// membership always rejects; there is no default tenant.
#[tokio::test]
async fn resolver_fails_closed() {
    let tenant = Tenant::provision("Acme");
    let tenant_id = tenant.id.clone();
    let resolver = ContextResolver::new(
        Arc::new(SingleTenantDirectory {
            membership: Membership::new("alice", tenant_id.clone(), Role::Member),
            tenant,
        }),
        audit(),
    );

    let cases = [
        (None, "alice", "TENANT_CONTEXT_REQUIRED"),
        (Some("not-a-tenant"), "alice", "INVALID_TENANT_ID"),
        (Some(tenant_id.as_str()), "mallory", "TENANT_MEMBERSHIP_INVALID"),
    ];
    for (claimed, user, expected) in cases {
        let claim = TenantClaim {
            claimed_tenant: claimed.map(String::from),
            user_id: user.to_string(),
            correlation_id: None,
        };
        let err = resolver.resolve(&claim).await.unwrap_err();
        assert_eq!(err.code(), expected);
        // Rejection text never names the tenant that was checked.
        assert!(!err.to_string().contains(tenant_id.as_str()));
    }

    let ok = resolver
        .resolve(&TenantClaim {
            claimed_tenant: Some(tenant_id.as_str().to_string()),
            user_id: "alice".to_string(),
            correlation_id: Some("corr-9".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(ok.tenant_id(), &tenant_id);
    assert_eq!(ok.correlation_id(), "corr-9");
}

// Monotonic usage: N concurrent increments of d land at exactly N*d, on
// the real SQLite upsert path as well as in memory.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_usage_increments_are_lossless() {
    for backend in adapters() {
        let meter = Arc::new(StoreUsageMeter::new(backend));
        let tenant = TenantId::generate();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let meter = meter.clone();
            let tenant = tenant.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    meter.add(&tenant, Metric::ApiCallsPerMonth, 3).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = meter.snapshot(&tenant).await.unwrap();
        assert_eq!(snapshot.get(Metric::ApiCallsPerMonth), 8 * 25 * 3);
    }
}

struct StarterSubscriptions;

#[async_trait]
impl SubscriptionDirectory for StarterSubscriptions {
    async fn subscriptions_for(&self, tenant_id: &TenantId) -> StoreResult<Vec<Subscription>> {
        Ok(vec![Subscription {
            id: "sub-1".to_string(),
            tenant_id: tenant_id.clone(),
            tier: PlanTier::Starter,
            status: SubscriptionStatus::Active,
            started_at: Utc::now() - chrono::Duration::days(10),
            ends_at: None,
            deleted_at: None,
        }])
    }
}

// The STARTER export scenario: 199 used of soft 100 / hard 200.
#[tokio::test]
async fn starter_export_limits_end_to_end() {
    let backend: Arc<dyn DataStore> = Arc::new(SqliteStore::in_memory().unwrap());
    let meter = Arc::new(StoreUsageMeter::new(backend));
    let engine = EntitlementEngine::new(
        Arc::new(PlanRegistry::builtin()),
        Arc::new(StarterSubscriptions),
        meter.clone(),
        audit(),
        EngineConfig::default(),
    );

    let tenant = TenantId::generate();
    let ctx = context(&tenant, "alice");
    let action = EntitlementAction::Metered(Metric::ExportsPerMonth);
    meter.add(&tenant, Metric::ExportsPerMonth, 199).await.unwrap();

    let one = engine.check(&ctx, &action, 1).await;
    assert!(one.allowed);
    assert!(one.warn);

    meter.add(&tenant, Metric::ExportsPerMonth, 1).await.unwrap();

    let two = engine.check(&ctx, &action, 2).await;
    assert!(!two.allowed);
    assert_eq!(two.reason.as_deref(), Some(REASON_HARD_LIMIT));
}

// The arithmetic-progression probe scenario from a numeric id scheme.
#[tokio::test]
async fn sequential_bulk_probe_is_rejected() {
    let detector = AttackDetector::new(
        Arc::new(MemoryStore::new()),
        audit(),
        DetectorConfig::default(),
    );
    let tenant = TenantId::generate();
    let ctx = context(&tenant, "alice");

    let ids: Vec<String> = [1000u64, 1001, 1002, 1003]
        .iter()
        .map(u64::to_string)
        .collect();
    let err = detector.validate_batch(&ctx, &ids).unwrap_err();
    match err {
        CoreError::Guard(guard) => assert_eq!(guard.code(), "SEQUENTIAL_BATCH"),
        other => panic!("unexpected error: {other:?}"),
    }
}

// Error-message hygiene: externally visible text from guard and isolation
// failures never contains the conflicting identifiers.
#[tokio::test]
async fn external_error_text_leaks_nothing() {
    let backend: Arc<dyn DataStore> = Arc::new(MemoryStore::new());
    let detector = AttackDetector::new(backend.clone(), audit(), DetectorConfig::default());
    let tenant_a = TenantId::generate();
    let tenant_b = TenantId::generate();
    let ctx = context(&tenant_a, "alice");

    let foreign_id = "550e8400-e29b-41d4-a716-446655440000";
    backend
        .insert(Record::new("documents", foreign_id, tenant_b.clone(), json!({})))
        .await
        .unwrap();

    let err = detector
        .validate_ownership(&ctx, "documents", foreign_id)
        .await
        .unwrap_err();
    let text = err.to_string();
    assert!(!text.contains(tenant_a.as_str()));
    assert!(!text.contains(tenant_b.as_str()));
    assert!(!text.contains("alice"));
    assert!(!text.contains(foreign_id));
}

// The audit trail records what responses must not say: the cross-tenant
// ownership case is distinguishable in the sink, at high severity.
#[tokio::test]
async fn audit_trail_captures_the_real_outcome() {
    struct Capture(parking_lot::Mutex<Vec<SecurityEvent>>);

    #[async_trait]
    impl AuditSink for Capture {
        async fn append(&self, event: SecurityEvent) -> StoreResult<()> {
            self.0.lock().push(event);
            Ok(())
        }
    }

    let sink = Arc::new(Capture(parking_lot::Mutex::new(Vec::new())));
    let backend: Arc<dyn DataStore> = Arc::new(MemoryStore::new());
    let detector = AttackDetector::new(
        backend.clone(),
        AuditEmitter::new(sink.clone()),
        DetectorConfig::default(),
    );

    let tenant_a = TenantId::generate();
    let tenant_b = TenantId::generate();
    let foreign_id = "550e8400-e29b-41d4-a716-446655440000";
    backend
        .insert(Record::new("documents", foreign_id, tenant_b, json!({})))
        .await
        .unwrap();

    let _ = detector
        .validate_ownership(&context(&tenant_a, "alice"), "documents", foreign_id)
        .await;

    // The emitter writes from a background task.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let events = sink.0.lock();
    assert!(
        events
            .iter()
            .any(|e| e.metadata["case"] == json!("foreign_tenant"))
    );
}
