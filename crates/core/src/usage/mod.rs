//! Usage metering over UTC calendar-month billing periods.

mod meter;
mod period;

pub use meter::{StoreUsageMeter, UsageMeter, UsageSnapshot};
pub use period::BillingPeriod;
