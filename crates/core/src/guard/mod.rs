//! Attack detection and error sanitization.
//!
//! Identifier-shape validation, enumeration and bulk-probe detection,
//! validation-attempt rate limiting, ownership checks with collapsed
//! outcomes, and the outbound error sanitizer.

mod detector;
mod rate_limit;
mod resource_id;
pub mod sanitize;

pub use detector::{AttackDetector, DetectorConfig};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use resource_id::{
    NUMERIC_ID_MAX_DIGITS, RESOURCE_ID_HEX_LEN, RESOURCE_ID_PREFIX, ResourceIdKind,
};
