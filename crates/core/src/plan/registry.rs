//! The immutable plan registry.
//!
//! Plan definitions are static configuration: built in, or loaded once
//! from JSON at process start, and never mutated afterwards. The registry
//! exposes an integrity hash over its canonical serialization so drift
//! against a known-good deployment can be detected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::entitlements::{
    ComplianceCapability, Entitlements, Feature, LimitRange, Metric,
};
use super::tier::PlanTier;
use crate::error::{StoreError, StoreResult};

/// One named tier and its entitlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDefinition {
    /// The tier this definition belongs to.
    pub tier: PlanTier,
    /// Human-readable plan name.
    pub display_name: String,
    /// The tier's entitlement record.
    pub entitlements: Entitlements,
}

/// Immutable registry of plan definitions, one per tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRegistry {
    plans: BTreeMap<PlanTier, PlanDefinition>,
}

impl PlanRegistry {
    /// Builds the registry of built-in plans.
    pub fn builtin() -> Self {
        let plans = [
            builtin_free(),
            builtin_trial(),
            builtin_starter(),
            builtin_pro(),
            builtin_enterprise(),
        ]
        .into_iter()
        .map(|p| (p.tier, p))
        .collect();
        Self { plans }
    }

    /// Loads a registry from JSON.
    ///
    /// # Errors
    ///
    /// Fails if the JSON is malformed or does not define every tier.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let registry: Self = serde_json::from_str(json)?;
        for tier in PlanTier::all() {
            if !registry.plans.contains_key(&tier) {
                return Err(StoreError::Serialization {
                    message: format!("plan registry is missing tier {tier}"),
                });
            }
        }
        Ok(registry)
    }

    /// Returns the definition for a tier.
    ///
    /// Every tier is guaranteed present by construction, so this cannot
    /// fail.
    pub fn get(&self, tier: PlanTier) -> &PlanDefinition {
        &self.plans[&tier]
    }

    /// Computes a SHA-256 hash over the registry's canonical JSON form.
    ///
    /// Ordered maps throughout the definitions make the serialization, and
    /// therefore the hash, deterministic.
    pub fn integrity_hash(&self) -> String {
        // Serialization of an in-memory value cannot fail.
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let digest = Sha256::digest(canonical.as_bytes());
        format!("{digest:x}")
    }
}

fn builtin_free() -> PlanDefinition {
    PlanDefinition {
        tier: PlanTier::Free,
        display_name: "Free".to_string(),
        entitlements: Entitlements {
            limits: limits([
                (Metric::Users, LimitRange::new(2, 3)),
                (Metric::Companies, LimitRange::new(1, 2)),
                (Metric::ExportsPerMonth, LimitRange::new(3, 5)),
                (Metric::ApiCallsPerMonth, LimitRange::new(500, 1000)),
                (Metric::StorageMb, LimitRange::new(100, 250)),
                (Metric::AuditRetentionDays, LimitRange::new(7, 7)),
            ]),
            features: features([("api_access", Feature::enabled())]),
            compliance: Default::default(),
        },
    }
}

fn builtin_trial() -> PlanDefinition {
    PlanDefinition {
        tier: PlanTier::Trial,
        display_name: "Trial".to_string(),
        entitlements: Entitlements {
            limits: limits([
                (Metric::Users, LimitRange::new(5, 10)),
                (Metric::Companies, LimitRange::new(3, 5)),
                (Metric::ExportsPerMonth, LimitRange::new(20, 40)),
                (Metric::ApiCallsPerMonth, LimitRange::new(5_000, 10_000)),
                (Metric::StorageMb, LimitRange::new(500, 1_000)),
                (Metric::AuditRetentionDays, LimitRange::new(14, 14)),
            ]),
            features: features([
                ("api_access", Feature::enabled()),
                ("custom_domain", Feature::enabled()),
            ]),
            compliance: Default::default(),
        },
    }
}

fn builtin_starter() -> PlanDefinition {
    PlanDefinition {
        tier: PlanTier::Starter,
        display_name: "Starter".to_string(),
        entitlements: Entitlements {
            limits: limits([
                (Metric::Users, LimitRange::new(10, 15)),
                (Metric::Companies, LimitRange::new(5, 10)),
                (Metric::ExportsPerMonth, LimitRange::new(100, 200)),
                (Metric::ApiCallsPerMonth, LimitRange::new(50_000, 100_000)),
                (Metric::StorageMb, LimitRange::new(5_000, 10_000)),
                (Metric::AuditRetentionDays, LimitRange::new(30, 30)),
            ]),
            features: features([
                ("api_access", Feature::enabled()),
                ("custom_domain", Feature::enabled()),
            ]),
            compliance: Default::default(),
        },
    }
}

fn builtin_pro() -> PlanDefinition {
    PlanDefinition {
        tier: PlanTier::Pro,
        display_name: "Pro".to_string(),
        entitlements: Entitlements {
            limits: limits([
                (Metric::Users, LimitRange::new(50, 75)),
                (Metric::Companies, LimitRange::new(50, 100)),
                (Metric::ExportsPerMonth, LimitRange::new(1_000, 2_000)),
                (Metric::ApiCallsPerMonth, LimitRange::new(500_000, 1_000_000)),
                (Metric::StorageMb, LimitRange::new(50_000, 100_000)),
                (Metric::AuditRetentionDays, LimitRange::new(90, 90)),
            ]),
            features: features([
                ("api_access", Feature::enabled()),
                ("custom_domain", Feature::enabled()),
                ("sso", Feature::enabled()),
                (
                    "audit_export",
                    Feature::compliance_gated([ComplianceCapability::Soc2], true),
                ),
            ]),
            compliance: [ComplianceCapability::Soc2].into_iter().collect(),
        },
    }
}

fn builtin_enterprise() -> PlanDefinition {
    PlanDefinition {
        tier: PlanTier::Enterprise,
        display_name: "Enterprise".to_string(),
        entitlements: Entitlements {
            limits: limits([
                (Metric::Users, LimitRange::new(1_000, 2_000)),
                (Metric::Companies, LimitRange::new(5_000, 10_000)),
                (Metric::ExportsPerMonth, LimitRange::new(50_000, 100_000)),
                (Metric::ApiCallsPerMonth, LimitRange::new(10_000_000, 20_000_000)),
                (Metric::StorageMb, LimitRange::new(1_000_000, 2_000_000)),
                (Metric::AuditRetentionDays, LimitRange::new(365, 365)),
            ]),
            features: features([
                ("api_access", Feature::enabled()),
                ("custom_domain", Feature::enabled()),
                ("sso", Feature::enabled()),
                (
                    "audit_export",
                    Feature::compliance_gated([ComplianceCapability::Soc2], true),
                ),
                (
                    "phi_storage",
                    Feature::compliance_gated([ComplianceCapability::Hipaa], true),
                ),
            ]),
            compliance: [
                ComplianceCapability::Soc2,
                ComplianceCapability::Hipaa,
                ComplianceCapability::Gdpr,
            ]
            .into_iter()
            .collect(),
        },
    }
}

fn limits<const N: usize>(entries: [(Metric, LimitRange); N]) -> BTreeMap<Metric, LimitRange> {
    entries.into_iter().collect()
}

fn features<const N: usize>(entries: [(&str, Feature); N]) -> BTreeMap<String, Feature> {
    entries
        .into_iter()
        .map(|(name, feature)| (name.to_string(), feature))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_tier() {
        let registry = PlanRegistry::builtin();
        for tier in PlanTier::all() {
            assert_eq!(registry.get(tier).tier, tier);
        }
    }

    #[test]
    fn test_limits_grow_with_tier() {
        let registry = PlanRegistry::builtin();
        let mut previous = 0;
        for tier in PlanTier::all() {
            let hard = registry
                .get(tier)
                .entitlements
                .limit(Metric::ExportsPerMonth)
                .unwrap()
                .hard;
            assert!(hard > previous, "{tier} hard limit must exceed lower tiers");
            previous = hard;
        }
    }

    #[test]
    fn test_starter_export_limits() {
        let registry = PlanRegistry::builtin();
        let range = registry
            .get(PlanTier::Starter)
            .entitlements
            .limit(Metric::ExportsPerMonth)
            .unwrap();
        assert_eq!(range.soft, 100);
        assert_eq!(range.hard, 200);
    }

    #[test]
    fn test_integrity_hash_is_stable_and_drift_sensitive() {
        let a = PlanRegistry::builtin();
        let b = PlanRegistry::builtin();
        assert_eq!(a.integrity_hash(), b.integrity_hash());

        let mut drifted = PlanRegistry::builtin();
        drifted
            .plans
            .get_mut(&PlanTier::Free)
            .unwrap()
            .entitlements
            .limits
            .insert(Metric::ExportsPerMonth, LimitRange::new(3, 6));
        assert_ne!(a.integrity_hash(), drifted.integrity_hash());
    }

    #[test]
    fn test_json_roundtrip() {
        let registry = PlanRegistry::builtin();
        let json = serde_json::to_string(&registry).unwrap();
        let loaded = PlanRegistry::from_json(&json).unwrap();
        assert_eq!(loaded.integrity_hash(), registry.integrity_hash());
    }

    #[test]
    fn test_from_json_requires_every_tier() {
        let err = PlanRegistry::from_json(r#"{"plans":{}}"#).unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }
}
