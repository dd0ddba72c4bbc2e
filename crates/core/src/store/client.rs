//! The narrow data-access interface.
//!
//! [`DataStore`] is the only surface the rest of the core talks to storage
//! through. It is deliberately narrow: structured [`Filter`] predicates for
//! everything routine, one escape hatch for raw queries, and an atomic
//! counter primitive for usage metering. Adapters implement this trait; the
//! tenant-scoping decorator wraps it.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use super::filter::Filter;
use super::record::Record;
use crate::error::StoreResult;
use crate::tenant::TenantId;

/// Connection-scoped variables an adapter establishes before raw queries
/// and batches.
///
/// Where the backend supports native session variables the adapter sets
/// them; otherwise it carries them locally and re-establishes them inside
/// every transaction boundary, so a pooled connection can never leak one
/// request's tenant into another's.
#[derive(Debug, Clone)]
pub struct SessionVars {
    /// The tenant the connection is acting for.
    pub tenant_id: TenantId,
    /// The acting user.
    pub user_id: String,
    /// The request this session belongs to, for tracing.
    pub request_id: String,
    /// Set when the caller is a service account rather than a person.
    pub service_account: bool,
}

impl SessionVars {
    /// Creates session variables for a tenant, user, and request.
    pub fn new(
        tenant_id: TenantId,
        user_id: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            user_id: user_id.into(),
            request_id: request_id.into(),
            service_account: false,
        }
    }

    /// Marks the session as acting for a service account.
    pub fn for_service_account(mut self) -> Self {
        self.service_account = true;
        self
    }
}

/// A single write inside a batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert a record.
    Insert {
        /// The record to insert.
        record: Record,
    },
    /// Patch every record matching the filter.
    Update {
        /// Target collection.
        collection: String,
        /// Rows to patch.
        filter: Filter,
        /// Shallow JSON-object merge applied to each matching record.
        patch: Value,
    },
    /// Soft-delete every record matching the filter.
    Delete {
        /// Target collection.
        collection: String,
        /// Rows to delete.
        filter: Filter,
    },
}

/// The storage interface all adapters implement.
///
/// Soft-deleted records are invisible to every operation here; adapters
/// filter them out before predicate evaluation.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Adapter name for error reporting and logs.
    fn name(&self) -> &'static str;

    /// Finds the first record matching the filter.
    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Record>>;

    /// Finds all records matching the filter, up to `limit` when given.
    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Record>>;

    /// Counts records matching the filter.
    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Inserts a record.
    ///
    /// # Errors
    ///
    /// Fails if a record with the same `(tenant, collection, id)` already
    /// exists.
    async fn insert(&self, record: Record) -> StoreResult<Record>;

    /// Applies a shallow JSON-object merge to every record matching the
    /// filter, returning the updated records.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Value,
    ) -> StoreResult<Vec<Record>>;

    /// Soft-deletes every record matching the filter, returning the count.
    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Executes a raw backend query under the given session variables.
    ///
    /// Callers never reach this directly; the scoped layer pattern-checks
    /// the text first. Adapters without a textual query language return
    /// [`crate::error::StoreError::QueryFailed`].
    async fn raw_query(&self, session: &SessionVars, query: &str) -> StoreResult<Vec<Value>>;

    /// Atomically adds `delta` to a usage counter and returns the new total.
    ///
    /// The upsert-and-add must be a single atomic operation in the backend;
    /// concurrent callers may interleave in any order but no increment is
    /// ever lost.
    async fn add_to_counter(
        &self,
        tenant_id: &TenantId,
        metric: &str,
        period: &str,
        delta: u64,
    ) -> StoreResult<u64>;

    /// Returns all counters for a tenant in a billing period, keyed by
    /// metric name. Metrics with no row are simply absent.
    async fn counters_for_period(
        &self,
        tenant_id: &TenantId,
        period: &str,
    ) -> StoreResult<HashMap<String, u64>>;

    /// Applies a batch of writes atomically: all succeed or none do.
    async fn execute_batch(&self, session: &SessionVars, ops: Vec<WriteOp>) -> StoreResult<()>;
}
