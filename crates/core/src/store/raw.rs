//! Pattern guard for the raw-query escape hatch.
//!
//! Raw query text cannot be scoped mechanically the way structured filters
//! can, so the escape hatch is guarded instead: the text must reference the
//! tenant column somewhere, and destructive statement patterns are rejected
//! outright unless the caller explicitly opens the administrative escape
//! hatch. This is a pattern check, not a SQL parse; it narrows the hole
//! rather than closing it, which is why raw queries also run under session
//! variables and are always audited.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::IsolationError;
use crate::tenant::TenantId;

static TENANT_PREDICATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btenant_id\b").expect("tenant predicate pattern"));

static DESTRUCTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(drop|alter|truncate)\b").expect("destructive pattern"));

/// Checks raw query text before it may reach an adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawQueryGuard {
    allow_destructive: bool,
}

impl RawQueryGuard {
    /// Creates a guard with the default policy: destructive statements are
    /// rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the administrative escape hatch for destructive statements.
    ///
    /// Intended for migration tooling only; never enable this on a
    /// request-serving path.
    pub fn allow_destructive(mut self) -> Self {
        self.allow_destructive = true;
        self
    }

    /// Validates raw query text for the given tenant.
    ///
    /// # Errors
    ///
    /// * [`IsolationError::UnscopedRawQuery`] - the text never references
    ///   the tenant column
    /// * [`IsolationError::DestructiveStatement`] - the text matches a
    ///   destructive pattern and the escape hatch is closed
    pub fn check(&self, tenant_id: &TenantId, query: &str) -> Result<(), IsolationError> {
        if !TENANT_PREDICATE.is_match(query) {
            return Err(IsolationError::UnscopedRawQuery {
                tenant_id: tenant_id.clone(),
            });
        }
        if !self.allow_destructive {
            if let Some(m) = DESTRUCTIVE.find(query) {
                return Err(IsolationError::DestructiveStatement {
                    tenant_id: tenant_id.clone(),
                    pattern: m.as_str().to_lowercase(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_without_tenant_predicate_rejected() {
        let guard = RawQueryGuard::new();
        let tenant = TenantId::generate();
        let err = guard
            .check(&tenant, "SELECT * FROM records")
            .unwrap_err();
        assert!(matches!(err, IsolationError::UnscopedRawQuery { .. }));
    }

    #[test]
    fn test_scoped_query_accepted() {
        let guard = RawQueryGuard::new();
        let tenant = TenantId::generate();
        assert!(
            guard
                .check(
                    &tenant,
                    "SELECT count(*) FROM records WHERE tenant_id = :tenant_id"
                )
                .is_ok()
        );
    }

    #[test]
    fn test_destructive_statement_rejected() {
        let guard = RawQueryGuard::new();
        let tenant = TenantId::generate();
        for sql in [
            "DROP TABLE records -- tenant_id",
            "alter table records add column x; -- tenant_id",
            "TRUNCATE records; -- tenant_id",
        ] {
            let err = guard.check(&tenant, sql).unwrap_err();
            assert!(matches!(err, IsolationError::DestructiveStatement { .. }));
        }
    }

    #[test]
    fn test_destructive_words_inside_identifiers_allowed() {
        let guard = RawQueryGuard::new();
        let tenant = TenantId::generate();
        // "dropped" and "alteration" must not trip the word-boundary match.
        assert!(
            guard
                .check(
                    &tenant,
                    "SELECT dropped, alteration FROM records WHERE tenant_id = :tenant_id"
                )
                .is_ok()
        );
    }

    #[test]
    fn test_escape_hatch_permits_destructive() {
        let guard = RawQueryGuard::new().allow_destructive();
        let tenant = TenantId::generate();
        // The tenant-column requirement still applies with the hatch open.
        assert!(
            guard
                .check(&tenant, "DROP INDEX records_by_tenant -- tenant_id")
                .is_ok()
        );
    }
}
