//! Structured query predicates.
//!
//! [`Filter`] is the only predicate form the data-access interface accepts:
//! a conjunction of [`Condition`]s plus optional OR branches, each branch a
//! nested filter. Because the shape is structured rather than textual, the
//! scoped layer can merge the tenant predicate into the top level *and* into
//! every OR branch, closing the alternative-condition bypass.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::Record;
use crate::tenant::TenantId;

/// Comparison operator for a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Field name (`id`, `tenant_id`, or a content field).
    pub field: String,
    /// Comparison operator.
    pub op: Op,
    /// Value to compare against.
    pub value: Value,
}

impl Condition {
    /// Creates an equality condition.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: Op::Eq,
            value: value.into(),
        }
    }

    fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.field(&self.field) else {
            return false;
        };
        match self.op {
            Op::Eq => actual == self.value,
            Op::Ne => actual != self.value,
            Op::Lt | Op::Lte | Op::Gt | Op::Gte => match (as_number(&actual), as_number(&self.value)) {
                (Some(a), Some(b)) => match self.op {
                    Op::Lt => a < b,
                    Op::Lte => a <= b,
                    Op::Gt => a > b,
                    Op::Gte => a >= b,
                    _ => unreachable!(),
                },
                _ => match (actual.as_str(), self.value.as_str()) {
                    (Some(a), Some(b)) => match self.op {
                        Op::Lt => a < b,
                        Op::Lte => a <= b,
                        Op::Gt => a > b,
                        Op::Gte => a >= b,
                        _ => unreachable!(),
                    },
                    _ => false,
                },
            },
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// A structured predicate: ANDed conditions plus optional OR branches.
///
/// A record matches when every condition in `all` holds and, if `any` is
/// non-empty, at least one branch matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Conditions that must all hold.
    #[serde(default)]
    pub all: Vec<Condition>,
    /// Alternative branches; at least one must hold when present.
    #[serde(default)]
    pub any: Vec<Filter>,
}

impl Filter {
    /// Creates an empty filter matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter with a single equality condition.
    pub fn by(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(Condition::eq(field, value))
    }

    /// Adds a condition to the conjunction.
    pub fn and(mut self, condition: Condition) -> Self {
        self.all.push(condition);
        self
    }

    /// Adds an OR branch.
    pub fn or(mut self, branch: Filter) -> Self {
        self.any.push(branch);
        self
    }

    /// Returns `true` if the filter has no conditions and no branches.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }

    /// Returns `true` if the record satisfies the predicate.
    pub fn matches(&self, record: &Record) -> bool {
        if !self.all.iter().all(|c| c.matches(record)) {
            return false;
        }
        if self.any.is_empty() {
            return true;
        }
        self.any.iter().any(|branch| branch.matches(record))
    }

    /// Merges the tenant predicate into this filter.
    ///
    /// The tenant condition is added to the top-level conjunction and,
    /// recursively, to every OR branch. The top-level condition alone would
    /// be sufficient for these semantics; scoping each branch as well keeps
    /// the generated predicate tenant-bound even if a branch is ever lifted
    /// out and evaluated on its own.
    pub fn scoped_to(mut self, tenant_id: &TenantId) -> Self {
        self.all
            .push(Condition::eq("tenant_id", tenant_id.as_str()));
        self.any = self
            .any
            .into_iter()
            .map(|branch| branch.scoped_to(tenant_id))
            .collect();
        self
    }

    /// Returns `true` if the filter (or any branch) constrains `tenant_id`.
    pub fn references_tenant(&self) -> bool {
        self.all.iter().any(|c| c.field == "tenant_id")
            || self.any.iter().any(Filter::references_tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(tenant: &TenantId, id: &str, content: Value) -> Record {
        Record::new("items", id, tenant.clone(), content)
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let tenant = TenantId::generate();
        let filter = Filter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&record(&tenant, "a", json!({}))));
    }

    #[test]
    fn test_eq_condition() {
        let tenant = TenantId::generate();
        let filter = Filter::by("name", "widget");
        assert!(filter.matches(&record(&tenant, "a", json!({"name": "widget"}))));
        assert!(!filter.matches(&record(&tenant, "a", json!({"name": "gadget"}))));
        assert!(!filter.matches(&record(&tenant, "a", json!({}))));
    }

    #[test]
    fn test_numeric_comparison() {
        let tenant = TenantId::generate();
        let filter = Filter::new().and(Condition {
            field: "qty".to_string(),
            op: Op::Gte,
            value: json!(10),
        });
        assert!(filter.matches(&record(&tenant, "a", json!({"qty": 10}))));
        assert!(filter.matches(&record(&tenant, "a", json!({"qty": 11}))));
        assert!(!filter.matches(&record(&tenant, "a", json!({"qty": 9}))));
    }

    #[test]
    fn test_or_branches() {
        let tenant = TenantId::generate();
        let filter = Filter::new()
            .or(Filter::by("status", "open"))
            .or(Filter::by("status", "pending"));

        assert!(filter.matches(&record(&tenant, "a", json!({"status": "open"}))));
        assert!(filter.matches(&record(&tenant, "a", json!({"status": "pending"}))));
        assert!(!filter.matches(&record(&tenant, "a", json!({"status": "closed"}))));
    }

    #[test]
    fn test_scoped_to_constrains_top_level() {
        let tenant_a = TenantId::generate();
        let tenant_b = TenantId::generate();
        let filter = Filter::by("name", "widget").scoped_to(&tenant_a);

        assert!(filter.matches(&record(&tenant_a, "a", json!({"name": "widget"}))));
        assert!(!filter.matches(&record(&tenant_b, "a", json!({"name": "widget"}))));
    }

    #[test]
    fn test_scoped_to_reaches_every_or_branch() {
        let tenant_a = TenantId::generate();
        let tenant_b = TenantId::generate();

        // An attacker-supplied filter trying to escape via an OR branch that
        // names another tenant explicitly.
        let filter = Filter::new()
            .or(Filter::by("status", "open"))
            .or(Filter::by("tenant_id", tenant_b.as_str()))
            .scoped_to(&tenant_a);

        // Each branch now also requires tenant_a, so the hostile branch can
        // never match a tenant_b row.
        assert!(!filter.matches(&record(&tenant_b, "a", json!({"status": "open"}))));
        for branch in &filter.any {
            assert!(branch.references_tenant());
        }
    }

    #[test]
    fn test_references_tenant() {
        let tenant = TenantId::generate();
        assert!(!Filter::by("name", "x").references_tenant());
        assert!(Filter::by("tenant_id", tenant.as_str()).references_tenant());
        assert!(
            Filter::new()
                .or(Filter::by("tenant_id", tenant.as_str()))
                .references_tenant()
        );
    }
}
