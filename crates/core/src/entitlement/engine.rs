//! The entitlement engine.
//!
//! Given a tenant context, an action, and a requested quantity, decide
//! GRANTED / DENIED / UPGRADE_REQUIRED / COMPLIANCE_REQUIRED. The engine is
//! explicitly constructed and dependency-injected, owning its own decision
//! cache; tests build a fresh instance.
//!
//! Fail-secure: any internal error during evaluation produces a denial,
//! never a grant.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::cache::DecisionCache;
use super::decision::EntitlementDecision;
use crate::audit::{AuditAction, AuditEmitter, AuditOutcome, SecurityEvent, Severity};
use crate::error::CoreResult;
use crate::plan::{Metric, PlanRegistry, PlanTier, SubscriptionDirectory, current_tier};
use crate::tenant::{TenantContext, TenantId};
use crate::usage::UsageMeter;

/// The action an entitlement check concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitlementAction {
    /// Consume `requested` units of a metered resource.
    Metered(Metric),
    /// Use a named feature.
    Feature(String),
}

impl EntitlementAction {
    /// Stable name, used as the cache key component and in audit records.
    pub fn name(&self) -> &str {
        match self {
            EntitlementAction::Metered(metric) => metric.as_str(),
            EntitlementAction::Feature(name) => name,
        }
    }
}

/// Configuration for the entitlement engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Decision cache TTL.
    pub cache_ttl: Duration,
    /// Interval of the background cache sweep.
    pub sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Evaluates plan limits and usage for tenant actions.
pub struct EntitlementEngine {
    registry: Arc<PlanRegistry>,
    subscriptions: Arc<dyn SubscriptionDirectory>,
    meter: Arc<dyn UsageMeter>,
    cache: DecisionCache,
    audit: AuditEmitter,
    config: EngineConfig,
}

impl EntitlementEngine {
    /// Creates an engine over the given collaborators.
    pub fn new(
        registry: Arc<PlanRegistry>,
        subscriptions: Arc<dyn SubscriptionDirectory>,
        meter: Arc<dyn UsageMeter>,
        audit: AuditEmitter,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            subscriptions,
            meter,
            cache: DecisionCache::new(config.cache_ttl),
            audit,
            config,
        }
    }

    /// Decides whether an action may proceed.
    ///
    /// Never returns an error: an internal failure during evaluation is
    /// converted into a fail-secure denial and audited.
    pub async fn check(
        &self,
        ctx: &TenantContext,
        action: &EntitlementAction,
        requested: u64,
    ) -> EntitlementDecision {
        let tier = match self.resolve_tier(ctx.tenant_id()).await {
            Ok(tier) => tier,
            Err(e) => {
                return self.fail_secure(ctx, action, requested, PlanTier::Free, &e);
            }
        };

        if let Some(cached) = self
            .cache
            .get(ctx.tenant_id(), ctx.user_id(), action.name(), requested, tier)
        {
            debug!(
                tenant_id = %ctx.tenant_id(),
                action = action.name(),
                "entitlement decision served from cache"
            );
            return cached;
        }

        let decision = match self.evaluate(ctx, action, requested, tier).await {
            Ok(decision) => decision,
            Err(e) => return self.fail_secure(ctx, action, requested, tier, &e),
        };

        self.cache.insert(
            ctx.tenant_id(),
            ctx.user_id(),
            action.name(),
            requested,
            tier,
            decision.clone(),
        );
        self.record(ctx, action, &decision);
        decision
    }

    /// Drops cached decisions for a tenant after its plan changed.
    pub fn plan_changed(&self, tenant_id: &TenantId, new_tier: PlanTier) {
        self.cache.invalidate_tenant(tenant_id);
        self.audit.emit(
            SecurityEvent::new(AuditAction::PlanChanged, AuditOutcome::Granted, Severity::Info)
                .tenant(tenant_id.clone())
                .metadata(json!({ "tier": new_tier.as_str() })),
        );
    }

    /// Returns the registry the engine decides against.
    pub fn registry(&self) -> &PlanRegistry {
        &self.registry
    }

    /// Resolves a tenant's current tier from its subscriptions.
    pub async fn resolve_tier(&self, tenant_id: &TenantId) -> CoreResult<PlanTier> {
        let subscriptions = self.subscriptions.subscriptions_for(tenant_id).await?;
        Ok(current_tier(&subscriptions, Utc::now()))
    }

    /// Spawns the background sweep evicting expired cache entries.
    ///
    /// Runs on its own schedule, independent of request traffic.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let interval = engine.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                engine.cache.sweep();
            }
        })
    }

    async fn evaluate(
        &self,
        ctx: &TenantContext,
        action: &EntitlementAction,
        requested: u64,
        tier: PlanTier,
    ) -> CoreResult<EntitlementDecision> {
        let entitlements = &self.registry.get(tier).entitlements;

        match action {
            EntitlementAction::Metered(metric) => {
                let Some(range) = entitlements.limit(*metric) else {
                    return Ok(EntitlementDecision::upgrade_required(tier, requested));
                };

                let snapshot = self.meter.snapshot(ctx.tenant_id()).await?;
                let current = snapshot.get(*metric);
                let projected = current.saturating_add(requested);

                Ok(if projected > range.hard {
                    EntitlementDecision::denied_hard_limit(tier, requested, range.hard, current)
                } else if projected > range.soft {
                    EntitlementDecision::granted(tier, requested)
                        .with_usage(range.hard, current)
                        .with_warning()
                } else {
                    EntitlementDecision::granted(tier, requested).with_usage(range.hard, current)
                })
            }
            EntitlementAction::Feature(name) => {
                let Some(feature) = entitlements.feature(name) else {
                    return Ok(EntitlementDecision::upgrade_required(tier, requested));
                };
                if !feature.enabled {
                    return Ok(EntitlementDecision::upgrade_required(tier, requested));
                }
                if !entitlements.satisfies(&feature.required_compliance) {
                    return Ok(if feature.compliance_blocking {
                        EntitlementDecision::compliance_required(tier, requested)
                    } else {
                        EntitlementDecision::granted(tier, requested).with_warning()
                    });
                }
                Ok(EntitlementDecision::granted(tier, requested))
            }
        }
    }

    fn fail_secure(
        &self,
        ctx: &TenantContext,
        action: &EntitlementAction,
        requested: u64,
        tier: PlanTier,
        error: &crate::error::CoreError,
    ) -> EntitlementDecision {
        warn!(
            tenant_id = %ctx.tenant_id(),
            action = action.name(),
            error = %error,
            "entitlement evaluation failed, denying"
        );
        self.audit.emit(
            SecurityEvent::new(AuditAction::EntitlementError, AuditOutcome::Error, Severity::High)
                .tenant(ctx.tenant_id().clone())
                .actor(ctx.user_id().to_string())
                .correlation(ctx.correlation_id().to_string())
                .metadata(json!({
                    "action": action.name(),
                    "error": error.to_string(),
                })),
        );
        EntitlementDecision::check_failed(tier, requested)
    }

    fn record(&self, ctx: &TenantContext, action: &EntitlementAction, decision: &EntitlementDecision) {
        let (audit_action, outcome, severity) = if !decision.allowed {
            (AuditAction::EntitlementDenied, AuditOutcome::Denied, Severity::Warning)
        } else if decision.warn {
            (AuditAction::EntitlementWarned, AuditOutcome::Warned, Severity::Info)
        } else {
            (AuditAction::EntitlementGranted, AuditOutcome::Granted, Severity::Debug)
        };
        self.audit.emit(
            SecurityEvent::new(audit_action, outcome, severity)
                .tenant(ctx.tenant_id().clone())
                .actor(ctx.user_id().to_string())
                .correlation(ctx.correlation_id().to_string())
                .metadata(json!({
                    "action": action.name(),
                    "tier": decision.tier.as_str(),
                    "reason": decision.reason,
                    "limit": decision.limit,
                    "current": decision.current,
                    "requested": decision.requested,
                })),
        );
    }
}
