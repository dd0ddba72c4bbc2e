//! Stored record type.
//!
//! Every tenant-scoped row is represented as a [`Record`]: a mandatory
//! `tenant_id` column, a logical identifier, and a JSON document body. The
//! tenant column is part of the primary key in every adapter, so `(tenant,
//! collection, id)` uniqueness is a storage-level constraint, not an
//! application convention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tenant::TenantId;

/// A stored row in a tenant-scoped collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// The collection (table) this record belongs to.
    pub collection: String,
    /// The record's logical identifier within the collection.
    pub id: String,
    /// The owning tenant. Every row carries this column.
    pub tenant_id: TenantId,
    /// The record body as a JSON document.
    pub content: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp; `Some` means the record is deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Creates a new record owned by the given tenant.
    pub fn new(
        collection: impl Into<String>,
        id: impl Into<String>,
        tenant_id: TenantId,
        content: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            collection: collection.into(),
            id: id.into(),
            tenant_id,
            content,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Returns `true` if the record is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Looks up a field for predicate evaluation.
    ///
    /// The metadata columns (`id`, `tenant_id`) resolve directly; any other
    /// name resolves against the content document.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "tenant_id" => Some(Value::String(self.tenant_id.as_str().to_string())),
            other => self.content.get(other).cloned(),
        }
    }
}

/// Applies a shallow JSON-object merge: keys in `patch` replace keys in
/// `content`, and a `null` value removes the key.
pub(crate) fn merge_patch(content: &mut Value, patch: &Value) {
    let (Some(target), Some(changes)) = (content.as_object_mut(), patch.as_object()) else {
        return;
    };
    for (key, value) in changes {
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_lookup() {
        let tenant = TenantId::generate();
        let record = Record::new("companies", "c-1", tenant.clone(), json!({"name": "Acme"}));

        assert_eq!(record.field("id"), Some(json!("c-1")));
        assert_eq!(record.field("tenant_id"), Some(json!(tenant.as_str())));
        assert_eq!(record.field("name"), Some(json!("Acme")));
        assert_eq!(record.field("missing"), None);
    }

    #[test]
    fn test_new_record_is_not_deleted() {
        let record = Record::new("companies", "c-1", TenantId::generate(), json!({}));
        assert!(!record.is_deleted());
        assert_eq!(record.created_at, record.updated_at);
    }
}
