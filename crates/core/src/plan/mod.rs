//! Plans: tiers, entitlements, the immutable registry, subscriptions.

mod entitlements;
mod registry;
mod subscription;
mod tier;

pub use entitlements::{ComplianceCapability, Entitlements, Feature, LimitRange, Metric};
pub use registry::{PlanDefinition, PlanRegistry};
pub use subscription::{
    StoreSubscriptionDirectory, Subscription, SubscriptionDirectory, SubscriptionStatus,
    current_tier,
};
pub use tier::PlanTier;
