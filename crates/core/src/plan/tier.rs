//! Plan tiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A subscription tier, ordered from least to most capable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanTier {
    /// Default tier for tenants with no subscription at all.
    Free,
    /// Time-boxed evaluation tier.
    Trial,
    /// Entry paid tier.
    Starter,
    /// Professional tier.
    Pro,
    /// Enterprise tier.
    Enterprise,
}

impl PlanTier {
    /// Returns the tier name as a stable string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "FREE",
            PlanTier::Trial => "TRIAL",
            PlanTier::Starter => "STARTER",
            PlanTier::Pro => "PRO",
            PlanTier::Enterprise => "ENTERPRISE",
        }
    }

    /// All tiers, in ascending order.
    pub fn all() -> [PlanTier; 5] {
        [
            PlanTier::Free,
            PlanTier::Trial,
            PlanTier::Starter,
            PlanTier::Pro,
            PlanTier::Enterprise,
        ]
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FREE" => Ok(PlanTier::Free),
            "TRIAL" => Ok(PlanTier::Trial),
            "STARTER" => Ok(PlanTier::Starter),
            "PRO" => Ok(PlanTier::Pro),
            "ENTERPRISE" => Ok(PlanTier::Enterprise),
            _ => Err(()),
        }
    }
}
