//! Error types for the isolation and entitlement core.
//!
//! This module defines all error types used throughout the core, following a
//! hierarchy that separates tenant-context errors, isolation violations,
//! attack-detection rejections, and infrastructure errors.
//!
//! Entitlement denials are deliberately *not* errors: they are first-class
//! decision outcomes (see [`crate::entitlement::EntitlementDecision`]) that
//! callers act on. Only infrastructure failures inside the engine surface
//! here, and those are converted to fail-secure denials before they reach a
//! caller.
//!
//! Every variant carries a stable machine-readable code via
//! [`CoreError::code`]. The human-readable messages are internal detail for
//! the audit log; anything leaving the process boundary must first pass
//! through [`crate::guard::sanitize`].

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::tenant::TenantId;

/// The primary error type for all core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Tenant-context resolution failures. Always fatal to the request.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Defensive isolation checks caught a cross-tenant condition.
    #[error(transparent)]
    Isolation(#[from] IsolationError),

    /// Attack-detection rejections (identifier shape, enumeration, rate limit).
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// Infrastructure errors from the underlying data store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Returns the stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Context(e) => e.code(),
            CoreError::Isolation(_) => "TENANT_ISOLATION_ERROR",
            CoreError::Guard(e) => e.code(),
            CoreError::Store(_) => "STORE_ERROR",
        }
    }
}

/// Errors produced while resolving the tenant context for a request.
///
/// These are always fatal to the request and never retried. There is no
/// fallback to a default tenant under any circumstance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// No tenant identifier was supplied at all.
    #[error("tenant context required")]
    TenantContextRequired,

    /// The supplied tenant identifier does not match the immutable-ID format.
    #[error("invalid tenant identifier")]
    InvalidTenantId,

    /// No active membership links the caller to the claimed tenant, or the
    /// tenant itself is inactive or soft-deleted.
    #[error("tenant membership invalid")]
    MembershipInvalid,
}

impl ContextError {
    /// Returns the stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ContextError::TenantContextRequired => "TENANT_CONTEXT_REQUIRED",
            ContextError::InvalidTenantId => "INVALID_TENANT_ID",
            ContextError::MembershipInvalid => "TENANT_MEMBERSHIP_INVALID",
        }
    }
}

/// A defensive isolation check caught a cross-tenant condition.
///
/// These are the highest-severity errors in the system: every one means a
/// filter-injection bug or a deliberate bypass attempt was stopped by the
/// last line of defense. They are always logged at critical severity and
/// should trigger an external alert in production.
#[derive(Error, Debug)]
pub enum IsolationError {
    /// A returned row's tenant column differs from the context's tenant.
    #[error("cross-tenant row detected during {operation} on {collection}")]
    CrossTenantRow {
        tenant_id: TenantId,
        collection: String,
        operation: String,
    },

    /// A raw query does not reference the tenant column.
    #[error("raw query rejected: no tenant predicate")]
    UnscopedRawQuery { tenant_id: TenantId },

    /// A raw query contains a destructive statement pattern outside the
    /// administrative escape hatch.
    #[error("raw query rejected: destructive statement pattern '{pattern}'")]
    DestructiveStatement { tenant_id: TenantId, pattern: String },
}

impl IsolationError {
    /// Returns the tenant whose context the violation occurred under.
    pub fn tenant_id(&self) -> &TenantId {
        match self {
            IsolationError::CrossTenantRow { tenant_id, .. }
            | IsolationError::UnscopedRawQuery { tenant_id }
            | IsolationError::DestructiveStatement { tenant_id, .. } => tenant_id,
        }
    }
}

/// Attack-detection rejections.
///
/// Fatal to the specific request, logged, and fed into the rate-limiting
/// counter; they never crash the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// The identifier matches none of the accepted shapes.
    #[error("invalid resource identifier format")]
    InvalidResourceIdFormat,

    /// The identifier matches a known-predictable pattern.
    #[error("identifier flagged as probable enumeration attempt")]
    SuspectedEnumeration,

    /// The batch exceeds the maximum permitted size.
    #[error("batch of {size} identifiers exceeds maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// Numeric identifiers in the batch form an arithmetic progression.
    #[error("batch flagged as sequential identifier probe")]
    SequentialBatch,

    /// Too many validation attempts in the current window.
    #[error("validation rate limit exceeded")]
    RateLimited,

    /// The resource does not exist. Deliberately indistinguishable to
    /// external callers from the foreign-tenant case.
    #[error("resource not found")]
    NotFound,

    /// The resource exists but may not be accessed from this context.
    #[error("access denied")]
    AccessDenied,
}

impl GuardError {
    /// Returns the stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            GuardError::InvalidResourceIdFormat => "INVALID_RESOURCE_ID_FORMAT",
            GuardError::SuspectedEnumeration => "SUSPECTED_ENUMERATION",
            GuardError::BatchTooLarge { .. } => "BATCH_TOO_LARGE",
            GuardError::SequentialBatch => "SEQUENTIAL_BATCH",
            GuardError::RateLimited => "RATE_LIMITED",
            GuardError::NotFound => "NOT_FOUND",
            GuardError::AccessDenied => "ACCESS_DENIED",
        }
    }
}

/// Errors originating from the underlying data store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryFailed { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// The named collection is not known to the store.
    #[error("unknown collection: {collection}")]
    UnknownCollection { collection: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// Implement conversions from common error types

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Store(err.into())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StoreError {
    fn from(_err: r2d2::Error) -> Self {
        StoreError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        }
    }
}
