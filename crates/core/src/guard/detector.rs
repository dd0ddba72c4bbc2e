//! Attack detection over resource identifiers.
//!
//! The detector validates identifiers and batches before they reach a
//! lookup, and answers ownership checks with deliberately collapsed
//! outcomes. It is explicitly constructed and dependency-injected; each
//! instance owns its own rate-limiter state, so tests build a fresh one.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use super::rate_limit::{RateLimitConfig, RateLimiter};
use super::resource_id::{self, ResourceIdKind};
use crate::audit::{AuditAction, AuditEmitter, AuditOutcome, SecurityEvent, Severity};
use crate::error::{CoreResult, GuardError};
use crate::store::{DataStore, Filter};
use crate::tenant::TenantContext;

/// Configuration for the attack detector.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Maximum identifiers accepted in one batch.
    pub max_batch_size: usize,
    /// Numeric identifiers below this value are treated as enumeration
    /// probes.
    pub min_numeric_id: u64,
    /// Budget for validation attempts per (tenant, user).
    pub rate_limit: RateLimitConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            min_numeric_id: 1000,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Validates identifiers, batches, and resource ownership.
pub struct AttackDetector {
    config: DetectorConfig,
    limiter: RateLimiter,
    store: Arc<dyn DataStore>,
    audit: AuditEmitter,
}

impl AttackDetector {
    /// Creates a detector over the given backend.
    ///
    /// The backend handle is used for one thing only: the minimal
    /// existence+ownership lookup, which must see the tenant column of rows
    /// in any tenant and therefore cannot go through the scoped layer.
    pub fn new(store: Arc<dyn DataStore>, audit: AuditEmitter, config: DetectorConfig) -> Self {
        Self {
            limiter: RateLimiter::new(config.rate_limit),
            config,
            store,
            audit,
        }
    }

    /// Validates a single resource identifier.
    ///
    /// Counts against the caller's validation-attempt budget.
    ///
    /// # Errors
    ///
    /// * [`GuardError::RateLimited`] - attempt budget exceeded
    /// * [`GuardError::InvalidResourceIdFormat`] - no accepted shape matches
    /// * [`GuardError::SuspectedEnumeration`] - numeric below the floor, or
    ///   a padded identifier
    pub fn validate_resource_id(
        &self,
        ctx: &TenantContext,
        id: &str,
    ) -> CoreResult<ResourceIdKind> {
        self.spend_attempt(ctx)?;
        self.check_shape(ctx, id)
    }

    /// Validates a batch of identifiers before a bulk operation.
    ///
    /// The whole batch counts as one validation attempt. Beyond per-id
    /// shape checks, numeric identifiers are scanned for constant-step
    /// arithmetic progressions; a progression is the signature of a
    /// sequential probe even when every individual identifier is
    /// well-formed.
    pub fn validate_batch(&self, ctx: &TenantContext, ids: &[String]) -> CoreResult<()> {
        self.spend_attempt(ctx)?;

        if ids.len() > self.config.max_batch_size {
            self.audit_rejection(
                ctx,
                AuditAction::BulkProbeSuspected,
                Severity::Warning,
                json!({ "size": ids.len(), "max": self.config.max_batch_size }),
            );
            return Err(GuardError::BatchTooLarge {
                size: ids.len(),
                max: self.config.max_batch_size,
            }
            .into());
        }

        for id in ids {
            self.check_shape(ctx, id)?;
        }

        let numeric: Vec<i64> = ids
            .iter()
            .filter_map(|id| resource_id::numeric_value(id))
            .map(|v| v as i64)
            .collect();
        if is_arithmetic_progression(&numeric) {
            warn!(
                tenant_id = %ctx.tenant_id(),
                batch_size = ids.len(),
                "sequential identifier probe rejected"
            );
            self.audit_rejection(
                ctx,
                AuditAction::BulkProbeSuspected,
                Severity::High,
                json!({ "size": ids.len(), "pattern": "arithmetic_progression" }),
            );
            return Err(GuardError::SequentialBatch.into());
        }
        Ok(())
    }

    /// Checks that a resource exists and belongs to the caller's tenant.
    ///
    /// Internally distinguishes missing / foreign-tenant / owned, but the
    /// first two collapse to [`GuardError::NotFound`] externally so an
    /// attacker cannot tell whether a guessed identifier exists in another
    /// tenant. The true case is recorded in the audit log only.
    pub async fn validate_ownership(
        &self,
        ctx: &TenantContext,
        collection: &str,
        id: &str,
    ) -> CoreResult<()> {
        self.validate_resource_id(ctx, id)?;

        let found = self
            .store
            .find_one(collection, &Filter::by("id", id))
            .await?;
        match found {
            None => {
                self.audit_ownership(ctx, collection, id, "not_found", Severity::Info);
                Err(GuardError::NotFound.into())
            }
            Some(record) if &record.tenant_id != ctx.tenant_id() => {
                self.audit_ownership(ctx, collection, id, "foreign_tenant", Severity::High);
                Err(GuardError::NotFound.into())
            }
            Some(_) => {
                self.audit_ownership(ctx, collection, id, "owned", Severity::Debug);
                Ok(())
            }
        }
    }

    fn check_shape(&self, ctx: &TenantContext, id: &str) -> CoreResult<ResourceIdKind> {
        let Some(kind) = resource_id::classify(id) else {
            self.audit_rejection(
                ctx,
                AuditAction::IdentifierRejected,
                Severity::Warning,
                json!({ "id": id }),
            );
            return Err(GuardError::InvalidResourceIdFormat.into());
        };

        let low_numeric = resource_id::numeric_value(id)
            .is_some_and(|v| v < self.config.min_numeric_id);
        if low_numeric || resource_id::looks_padded(id) {
            self.audit_rejection(
                ctx,
                AuditAction::EnumerationSuspected,
                Severity::High,
                json!({ "id": id }),
            );
            return Err(GuardError::SuspectedEnumeration.into());
        }
        Ok(kind)
    }

    fn spend_attempt(&self, ctx: &TenantContext) -> CoreResult<()> {
        let key = format!("{}:{}", ctx.tenant_id(), ctx.user_id());
        if self.limiter.check(&key) {
            return Ok(());
        }
        self.audit_rejection(
            ctx,
            AuditAction::RateLimitTripped,
            Severity::High,
            json!({}),
        );
        Err(GuardError::RateLimited.into())
    }

    fn audit_rejection(
        &self,
        ctx: &TenantContext,
        action: AuditAction,
        severity: Severity,
        metadata: serde_json::Value,
    ) {
        self.audit.emit(
            SecurityEvent::new(action, AuditOutcome::Denied, severity)
                .tenant(ctx.tenant_id().clone())
                .actor(ctx.user_id().to_string())
                .correlation(ctx.correlation_id().to_string())
                .metadata(metadata),
        );
    }

    fn audit_ownership(
        &self,
        ctx: &TenantContext,
        collection: &str,
        id: &str,
        case: &str,
        severity: Severity,
    ) {
        let outcome = if case == "owned" {
            AuditOutcome::Granted
        } else {
            AuditOutcome::Denied
        };
        self.audit.emit(
            SecurityEvent::new(AuditAction::OwnershipChecked, outcome, severity)
                .tenant(ctx.tenant_id().clone())
                .actor(ctx.user_id().to_string())
                .resource(collection, id)
                .correlation(ctx.correlation_id().to_string())
                .metadata(json!({ "case": case })),
        );
    }
}

fn is_arithmetic_progression(values: &[i64]) -> bool {
    if values.len() < 3 {
        return false;
    }
    let step = values[1] - values[0];
    values.windows(2).all(|w| w[1] - w[0] == step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditSink;
    use crate::error::CoreError;
    use crate::store::{MemoryStore, Record};
    use crate::tenant::TenantId;
    use serde_json::json;
    use std::time::Duration;

    fn context(tenant: &TenantId) -> TenantContext {
        TenantContext::new(tenant.clone(), "user-1", "req-1", "corr-1")
    }

    fn detector(store: Arc<MemoryStore>, config: DetectorConfig) -> AttackDetector {
        let audit = AuditEmitter::new(Arc::new(InMemoryAuditSink::new()));
        AttackDetector::new(store, audit, config)
    }

    fn guard_code(err: CoreError) -> &'static str {
        match err {
            CoreError::Guard(g) => g.code(),
            other => panic!("expected guard error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_valid_shapes_accepted() {
        let detector = detector(Arc::new(MemoryStore::new()), DetectorConfig::default());
        let tenant = TenantId::generate();
        let ctx = context(&tenant);

        let hash_id = format!("res_{}", "3a7bd3e236".repeat(4));
        assert_eq!(
            detector.validate_resource_id(&ctx, &hash_id).unwrap(),
            ResourceIdKind::ContentAddressed
        );
        assert_eq!(
            detector
                .validate_resource_id(&ctx, "550e8400-e29b-41d4-a716-446655440000")
                .unwrap(),
            ResourceIdKind::Uuid
        );
        assert_eq!(
            detector.validate_resource_id(&ctx, "123456").unwrap(),
            ResourceIdKind::Numeric
        );
    }

    #[tokio::test]
    async fn test_malformed_and_low_ids_rejected() {
        let detector = detector(Arc::new(MemoryStore::new()), DetectorConfig::default());
        let tenant = TenantId::generate();
        let ctx = context(&tenant);

        let err = detector
            .validate_resource_id(&ctx, "1 OR 1=1")
            .unwrap_err();
        assert_eq!(guard_code(err), "INVALID_RESOURCE_ID_FORMAT");

        let err = detector.validate_resource_id(&ctx, "42").unwrap_err();
        assert_eq!(guard_code(err), "SUSPECTED_ENUMERATION");
    }

    #[tokio::test]
    async fn test_sequential_batch_rejected() {
        let detector = detector(Arc::new(MemoryStore::new()), DetectorConfig::default());
        let tenant = TenantId::generate();
        let ctx = context(&tenant);

        // Every id is individually well-formed; the progression is not.
        let ids: Vec<String> = ["1000", "1001", "1002", "1003"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let err = detector.validate_batch(&ctx, &ids).unwrap_err();
        assert_eq!(guard_code(err), "SEQUENTIAL_BATCH");

        // Constant non-unit step is still a progression.
        let ids: Vec<String> = ["1000", "1010", "1020"].iter().map(|s| s.to_string()).collect();
        let err = detector.validate_batch(&ctx, &ids).unwrap_err();
        assert_eq!(guard_code(err), "SEQUENTIAL_BATCH");

        // Irregular steps pass.
        let ids: Vec<String> = ["1000", "5417", "9023"].iter().map(|s| s.to_string()).collect();
        assert!(detector.validate_batch(&ctx, &ids).is_ok());
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let mut config = DetectorConfig::default();
        config.max_batch_size = 3;
        let detector = detector(Arc::new(MemoryStore::new()), config);
        let tenant = TenantId::generate();
        let ctx = context(&tenant);

        let ids: Vec<String> = (0..4)
            .map(|_| "550e8400-e29b-41d4-a716-446655440000".to_string())
            .collect();
        let err = detector.validate_batch(&ctx, &ids).unwrap_err();
        assert_eq!(guard_code(err), "BATCH_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_rate_limit_trips() {
        let mut config = DetectorConfig::default();
        config.rate_limit = RateLimitConfig {
            max_attempts: 2,
            window: Duration::from_secs(60),
        };
        let detector = detector(Arc::new(MemoryStore::new()), config);
        let tenant = TenantId::generate();
        let ctx = context(&tenant);

        assert!(detector.validate_resource_id(&ctx, "123456").is_ok());
        assert!(detector.validate_resource_id(&ctx, "123456").is_ok());
        let err = detector.validate_resource_id(&ctx, "123456").unwrap_err();
        assert_eq!(guard_code(err), "RATE_LIMITED");
    }

    #[tokio::test]
    async fn test_ownership_collapses_missing_and_foreign() {
        let store = Arc::new(MemoryStore::new());
        let detector = detector(store.clone(), DetectorConfig::default());
        let tenant_a = TenantId::generate();
        let tenant_b = TenantId::generate();
        let ctx = context(&tenant_a);

        let owned_id = "550e8400-e29b-41d4-a716-446655440000";
        let foreign_id = "650e8400-e29b-41d4-a716-446655440111";
        store
            .insert(Record::new("documents", owned_id, tenant_a.clone(), json!({})))
            .await
            .unwrap();
        store
            .insert(Record::new("documents", foreign_id, tenant_b.clone(), json!({})))
            .await
            .unwrap();

        assert!(
            detector
                .validate_ownership(&ctx, "documents", owned_id)
                .await
                .is_ok()
        );

        let missing = detector
            .validate_ownership(&ctx, "documents", "750e8400-e29b-41d4-a716-446655440222")
            .await
            .unwrap_err();
        let foreign = detector
            .validate_ownership(&ctx, "documents", foreign_id)
            .await
            .unwrap_err();

        // Externally indistinguishable.
        assert_eq!(missing.code(), "NOT_FOUND");
        assert_eq!(foreign.code(), "NOT_FOUND");
        assert_eq!(missing.to_string(), foreign.to_string());
    }
}
