//! Security event definitions.
//!
//! A [`SecurityEvent`] is the immutable, write-once audit record emitted for
//! every authorization and entitlement decision. Events are append-only and
//! are never updated or deleted (compliance requirement).

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::tenant::TenantId;

/// The action a security event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // Context resolution
    ContextResolved,
    ContextRejected,

    // Data access
    ScopedRead,
    ScopedWrite,
    RawQuery,
    IsolationViolation,

    // Attack detection
    IdentifierRejected,
    EnumerationSuspected,
    BulkProbeSuspected,
    RateLimitTripped,
    OwnershipChecked,

    // Entitlements
    EntitlementGranted,
    EntitlementWarned,
    EntitlementDenied,
    EntitlementError,
    PlanChanged,
}

impl AuditAction {
    /// Returns the action as a stable string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ContextResolved => "context_resolved",
            AuditAction::ContextRejected => "context_rejected",
            AuditAction::ScopedRead => "scoped_read",
            AuditAction::ScopedWrite => "scoped_write",
            AuditAction::RawQuery => "raw_query",
            AuditAction::IsolationViolation => "isolation_violation",
            AuditAction::IdentifierRejected => "identifier_rejected",
            AuditAction::EnumerationSuspected => "enumeration_suspected",
            AuditAction::BulkProbeSuspected => "bulk_probe_suspected",
            AuditAction::RateLimitTripped => "rate_limit_tripped",
            AuditAction::OwnershipChecked => "ownership_checked",
            AuditAction::EntitlementGranted => "entitlement_granted",
            AuditAction::EntitlementWarned => "entitlement_warned",
            AuditAction::EntitlementDenied => "entitlement_denied",
            AuditAction::EntitlementError => "entitlement_error",
            AuditAction::PlanChanged => "plan_changed",
        }
    }
}

/// Outcome of the decision the event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Granted,
    Warned,
    Denied,
    Violation,
    Error,
}

/// Severity of a security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    High,
    Critical,
}

/// An immutable audit record of an authorization or entitlement decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// The tenant the decision concerned, if one was resolved.
    pub tenant_id: Option<TenantId>,
    /// The acting user, if known.
    pub actor_id: Option<String>,
    /// The recorded action.
    pub action: AuditAction,
    /// Resource type involved, if any.
    pub resource_type: Option<String>,
    /// Resource identifier involved, if any.
    pub resource_id: Option<String>,
    /// The decision outcome.
    pub outcome: AuditOutcome,
    /// Correlation identifier for tracing.
    pub correlation_id: Option<String>,
    /// Event severity.
    pub severity: Severity,
    /// Structured metadata; internal detail lives here, never in responses.
    pub metadata: Value,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
}

impl SecurityEvent {
    /// Creates a new event with the given action and outcome.
    pub fn new(action: AuditAction, outcome: AuditOutcome, severity: Severity) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            actor_id: None,
            action,
            resource_type: None,
            resource_id: None,
            outcome,
            correlation_id: None,
            severity,
            metadata: Value::Null,
            timestamp: Utc::now(),
        }
    }

    /// Sets the tenant the event concerns.
    pub fn tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Sets the acting user.
    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Sets the resource the event concerns.
    pub fn resource(mut self, resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Sets the correlation identifier.
    pub fn correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Attaches structured metadata.
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_builder() {
        let tenant = TenantId::generate();
        let event = SecurityEvent::new(
            AuditAction::EntitlementDenied,
            AuditOutcome::Denied,
            Severity::Warning,
        )
        .tenant(tenant.clone())
        .actor("user-1")
        .resource("export", "exp-9")
        .correlation("corr-1")
        .metadata(json!({"limit": 200}));

        assert_eq!(event.tenant_id, Some(tenant));
        assert_eq!(event.actor_id.as_deref(), Some("user-1"));
        assert_eq!(event.resource_type.as_deref(), Some("export"));
        assert_eq!(event.outcome, AuditOutcome::Denied);
        assert_eq!(event.metadata["limit"], 200);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = SecurityEvent::new(AuditAction::RawQuery, AuditOutcome::Granted, Severity::Info);
        let b = SecurityEvent::new(AuditAction::RawQuery, AuditOutcome::Granted, Severity::Info);
        assert_ne!(a.id, b.id);
    }
}
