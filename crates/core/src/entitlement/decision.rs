//! Entitlement decisions.
//!
//! A decision is a first-class outcome, not an error: callers act on it
//! (block, warn, prompt an upgrade). Denials carry a stable
//! machine-readable reason code.

use serde::{Deserialize, Serialize};

use crate::plan::PlanTier;

/// Reason code for a hard-limit denial.
pub const REASON_HARD_LIMIT: &str = "ENTITLEMENT_HARD_LIMIT";

/// Reason code when the tier does not include the feature or resource.
pub const REASON_UPGRADE_REQUIRED: &str = "UPGRADE_REQUIRED";

/// Reason code when required compliance capabilities are missing.
pub const REASON_COMPLIANCE_REQUIRED: &str = "COMPLIANCE_REQUIRED";

/// Reason code for a fail-secure denial after an internal error.
pub const REASON_CHECK_FAILED: &str = "ENTITLEMENT_CHECK_FAILED";

/// The category of an entitlement decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    /// The action may proceed.
    Granted,
    /// The action may not proceed.
    Denied,
    /// The action requires a higher tier.
    UpgradeRequired,
    /// The action requires compliance capabilities the tier lacks.
    ComplianceRequired,
}

/// The result of an entitlement check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementDecision {
    /// The decision category.
    pub outcome: DecisionOutcome,
    /// Whether the caller may proceed.
    pub allowed: bool,
    /// Soft-limit flag: allowed, but the tenant should be nudged.
    pub warn: bool,
    /// Machine-readable reason code when not plainly granted.
    pub reason: Option<String>,
    /// The hard limit consulted, for metered checks.
    pub limit: Option<u64>,
    /// Usage at the time of the check, for metered checks.
    pub current: Option<u64>,
    /// The quantity that was requested.
    pub requested: u64,
    /// The tier the decision was made under.
    pub tier: PlanTier,
}

impl EntitlementDecision {
    /// A plain grant.
    pub fn granted(tier: PlanTier, requested: u64) -> Self {
        Self {
            outcome: DecisionOutcome::Granted,
            allowed: true,
            warn: false,
            reason: None,
            limit: None,
            current: None,
            requested,
            tier,
        }
    }

    /// Attaches metered context to the decision.
    pub fn with_usage(mut self, limit: u64, current: u64) -> Self {
        self.limit = Some(limit);
        self.current = Some(current);
        self
    }

    /// Marks the decision as a soft-limit warning.
    pub fn with_warning(mut self) -> Self {
        self.warn = true;
        self
    }

    /// A hard-limit denial.
    pub fn denied_hard_limit(tier: PlanTier, requested: u64, limit: u64, current: u64) -> Self {
        Self {
            outcome: DecisionOutcome::Denied,
            allowed: false,
            warn: false,
            reason: Some(REASON_HARD_LIMIT.to_string()),
            limit: Some(limit),
            current: Some(current),
            requested,
            tier,
        }
    }

    /// The tier does not include the feature or resource.
    pub fn upgrade_required(tier: PlanTier, requested: u64) -> Self {
        Self {
            outcome: DecisionOutcome::UpgradeRequired,
            allowed: false,
            warn: false,
            reason: Some(REASON_UPGRADE_REQUIRED.to_string()),
            limit: None,
            current: None,
            requested,
            tier,
        }
    }

    /// Required compliance capabilities are missing.
    pub fn compliance_required(tier: PlanTier, requested: u64) -> Self {
        Self {
            outcome: DecisionOutcome::ComplianceRequired,
            allowed: false,
            warn: false,
            reason: Some(REASON_COMPLIANCE_REQUIRED.to_string()),
            limit: None,
            current: None,
            requested,
            tier,
        }
    }

    /// Fail-secure denial after an internal error.
    pub fn check_failed(tier: PlanTier, requested: u64) -> Self {
        Self {
            outcome: DecisionOutcome::Denied,
            allowed: false,
            warn: false,
            reason: Some(REASON_CHECK_FAILED.to_string()),
            limit: None,
            current: None,
            requested,
            tier,
        }
    }
}
