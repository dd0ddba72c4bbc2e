//! Entitlement evaluation: decisions, caching, the engine.

mod cache;
mod decision;
mod engine;

pub use cache::DecisionCache;
pub use decision::{
    DecisionOutcome, EntitlementDecision, REASON_CHECK_FAILED, REASON_COMPLIANCE_REQUIRED,
    REASON_HARD_LIMIT, REASON_UPGRADE_REQUIRED,
};
pub use engine::{EngineConfig, EntitlementAction, EntitlementEngine};
