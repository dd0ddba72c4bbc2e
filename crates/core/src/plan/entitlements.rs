//! Entitlement definitions: metered limits, feature flags, compliance.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Metered resource kinds a plan can limit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Member seats in the tenant.
    Users,
    /// Company records.
    Companies,
    /// Data exports per billing period.
    ExportsPerMonth,
    /// API calls per billing period.
    ApiCallsPerMonth,
    /// Stored data, in megabytes.
    StorageMb,
    /// Audit-log retention, in days.
    AuditRetentionDays,
}

impl Metric {
    /// Returns the metric name used as the usage-counter key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Users => "users",
            Metric::Companies => "companies",
            Metric::ExportsPerMonth => "exports_per_month",
            Metric::ApiCallsPerMonth => "api_calls_per_month",
            Metric::StorageMb => "storage_mb",
            Metric::AuditRetentionDays => "audit_retention_days",
        }
    }

    /// All metered kinds.
    pub fn all() -> [Metric; 6] {
        [
            Metric::Users,
            Metric::Companies,
            Metric::ExportsPerMonth,
            Metric::ApiCallsPerMonth,
            Metric::StorageMb,
            Metric::AuditRetentionDays,
        ]
    }
}

/// A soft/hard numeric bound on a metered resource.
///
/// Crossing the soft limit warns; crossing the hard limit denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRange {
    /// Warn-only threshold.
    pub soft: u64,
    /// Enforced threshold.
    pub hard: u64,
}

impl LimitRange {
    /// Creates a limit range. `soft` is clamped to `hard`.
    pub const fn new(soft: u64, hard: u64) -> Self {
        Self {
            soft: if soft > hard { hard } else { soft },
            hard,
        }
    }
}

/// Compliance capabilities a tier can include.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceCapability {
    /// SOC 2 controls.
    Soc2,
    /// HIPAA safeguards.
    Hipaa,
    /// GDPR data-handling guarantees.
    Gdpr,
}

/// A boolean feature flag with optional compliance requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Whether the tier includes the feature at all.
    pub enabled: bool,
    /// Compliance capabilities the feature needs.
    #[serde(default)]
    pub required_compliance: BTreeSet<ComplianceCapability>,
    /// When `true`, missing compliance blocks the feature outright rather
    /// than merely warning.
    #[serde(default)]
    pub compliance_blocking: bool,
}

impl Feature {
    /// A plain enabled feature with no compliance requirements.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            required_compliance: BTreeSet::new(),
            compliance_blocking: false,
        }
    }

    /// An enabled feature gated on compliance capabilities.
    pub fn compliance_gated(
        required: impl IntoIterator<Item = ComplianceCapability>,
        blocking: bool,
    ) -> Self {
        Self {
            enabled: true,
            required_compliance: required.into_iter().collect(),
            compliance_blocking: blocking,
        }
    }
}

/// The full entitlement record of one tier.
///
/// Ordered maps keep serialization deterministic, which the registry
/// integrity hash depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlements {
    /// Numeric limits per metered resource.
    pub limits: BTreeMap<Metric, LimitRange>,
    /// Feature flags by name.
    pub features: BTreeMap<String, Feature>,
    /// Compliance capabilities the tier includes.
    pub compliance: BTreeSet<ComplianceCapability>,
}

impl Entitlements {
    /// Looks up the limit for a metric, if the tier meters it.
    pub fn limit(&self, metric: Metric) -> Option<LimitRange> {
        self.limits.get(&metric).copied()
    }

    /// Looks up a feature flag by name.
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    /// Returns `true` if the tier includes every listed capability.
    pub fn satisfies(&self, required: &BTreeSet<ComplianceCapability>) -> bool {
        required.is_subset(&self.compliance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_range_clamps_soft() {
        let range = LimitRange::new(500, 200);
        assert_eq!(range.soft, 200);
        assert_eq!(range.hard, 200);
    }

    #[test]
    fn test_compliance_subset() {
        let entitlements = Entitlements {
            limits: BTreeMap::new(),
            features: BTreeMap::new(),
            compliance: [ComplianceCapability::Soc2].into_iter().collect(),
        };
        assert!(entitlements.satisfies(&BTreeSet::new()));
        assert!(entitlements.satisfies(&[ComplianceCapability::Soc2].into_iter().collect()));
        assert!(!entitlements.satisfies(&[ComplianceCapability::Hipaa].into_iter().collect()));
    }
}
