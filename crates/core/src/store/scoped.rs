//! Tenant-scoped storage decorator.
//!
//! [`ScopedStore`] wraps a [`DataStore`] and is the only storage handle
//! application code ever holds. Every operation takes a validated
//! [`TenantContext`] and:
//!
//! * merges the context's tenant into the predicate (including every OR
//!   branch) before the adapter sees it,
//! * forces the tenant column on creation from the context, ignoring
//!   whatever the payload claims,
//! * pattern-guards the raw-query escape hatch, and
//! * re-checks the tenant column of every row an operation returns. A
//!   mismatch aborts the whole operation with
//!   [`IsolationError::CrossTenantRow`] before any row reaches the caller.
//!
//! The re-check is a defense-in-depth invariant, not the primary mechanism;
//! tripping it means a filter-injection bug or a hostile adapter, so it is
//! audited at critical severity.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, error};
use uuid::Uuid;

use super::client::{DataStore, SessionVars, WriteOp};
use super::filter::Filter;
use super::raw::RawQueryGuard;
use super::record::Record;
use crate::audit::{AuditAction, AuditEmitter, AuditOutcome, SecurityEvent, Severity};
use crate::error::{CoreResult, IsolationError};
use crate::tenant::TenantContext;

/// Tenant-scoped view over a [`DataStore`].
#[derive(Clone)]
pub struct ScopedStore {
    inner: Arc<dyn DataStore>,
    audit: AuditEmitter,
    raw_guard: RawQueryGuard,
}

impl ScopedStore {
    /// Wraps a data store in the tenant-scoping decorator.
    pub fn new(inner: Arc<dyn DataStore>, audit: AuditEmitter) -> Self {
        Self {
            inner,
            audit,
            raw_guard: RawQueryGuard::new(),
        }
    }

    /// Replaces the raw-query guard, e.g. to open the administrative
    /// destructive-statement escape hatch for migration tooling.
    pub fn with_raw_guard(mut self, guard: RawQueryGuard) -> Self {
        self.raw_guard = guard;
        self
    }

    /// Returns the underlying adapter.
    ///
    /// For wiring only (sharing a pool with an audit sink); never use it to
    /// bypass scoping on a request path.
    pub fn backend(&self) -> Arc<dyn DataStore> {
        Arc::clone(&self.inner)
    }

    /// Finds one record in the caller's tenant.
    pub async fn find_one(
        &self,
        ctx: &TenantContext,
        collection: &str,
        filter: Filter,
    ) -> CoreResult<Option<Record>> {
        let scoped = filter.scoped_to(ctx.tenant_id());
        let found = self.inner.find_one(collection, &scoped).await?;
        if let Some(record) = &found {
            self.verify_row(ctx, collection, "find_one", record)?;
        }
        self.audit_read(ctx, collection, "find_one");
        Ok(found)
    }

    /// Finds records in the caller's tenant.
    pub async fn find_many(
        &self,
        ctx: &TenantContext,
        collection: &str,
        filter: Filter,
        limit: Option<usize>,
    ) -> CoreResult<Vec<Record>> {
        let scoped = filter.scoped_to(ctx.tenant_id());
        let rows = self.inner.find_many(collection, &scoped, limit).await?;
        for record in &rows {
            self.verify_row(ctx, collection, "find_many", record)?;
        }
        self.audit_read(ctx, collection, "find_many");
        Ok(rows)
    }

    /// Counts records in the caller's tenant.
    pub async fn count(
        &self,
        ctx: &TenantContext,
        collection: &str,
        filter: Filter,
    ) -> CoreResult<u64> {
        let scoped = filter.scoped_to(ctx.tenant_id());
        Ok(self.inner.count(collection, &scoped).await?)
    }

    /// Creates a record owned by the caller's tenant.
    ///
    /// The owner is taken from the context. A `tenant_id` field in the
    /// payload is stripped rather than honored, so a client cannot create a
    /// row into another tenant no matter what it sends.
    pub async fn create(
        &self,
        ctx: &TenantContext,
        collection: &str,
        id: Option<String>,
        mut content: Value,
    ) -> CoreResult<Record> {
        if let Some(obj) = content.as_object_mut() {
            obj.remove("tenant_id");
        }
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let record = Record::new(collection, id, ctx.tenant_id().clone(), content);
        let stored = self.inner.insert(record).await?;
        self.verify_row(ctx, collection, "create", &stored)?;
        self.audit_write(ctx, collection, "create", &stored.id);
        Ok(stored)
    }

    /// Patches records in the caller's tenant.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        collection: &str,
        filter: Filter,
        mut patch: Value,
    ) -> CoreResult<Vec<Record>> {
        if let Some(obj) = patch.as_object_mut() {
            obj.remove("tenant_id");
        }
        let scoped = filter.scoped_to(ctx.tenant_id());
        let rows = self.inner.update_many(collection, &scoped, &patch).await?;
        for record in &rows {
            self.verify_row(ctx, collection, "update", record)?;
        }
        self.audit_write(ctx, collection, "update", &format!("{} rows", rows.len()));
        Ok(rows)
    }

    /// Soft-deletes records in the caller's tenant, returning the count.
    pub async fn delete(
        &self,
        ctx: &TenantContext,
        collection: &str,
        filter: Filter,
    ) -> CoreResult<u64> {
        let scoped = filter.scoped_to(ctx.tenant_id());
        let deleted = self.inner.delete_many(collection, &scoped).await?;
        self.audit_write(ctx, collection, "delete", &format!("{deleted} rows"));
        Ok(deleted)
    }

    /// Runs a raw backend query through the pattern guard.
    ///
    /// The query text must reference the tenant column and must not contain
    /// destructive statement patterns. The adapter runs it under session
    /// variables bound to the caller's tenant, and the attempt is always
    /// audited, accepted or not.
    pub async fn raw_query(
        &self,
        ctx: &TenantContext,
        query: &str,
    ) -> CoreResult<Vec<Value>> {
        if let Err(violation) = self.raw_guard.check(ctx.tenant_id(), query) {
            self.audit_violation(ctx, &violation, json!({ "query": query }));
            return Err(violation.into());
        }

        self.audit.emit(
            SecurityEvent::new(AuditAction::RawQuery, AuditOutcome::Granted, Severity::Info)
                .tenant(ctx.tenant_id().clone())
                .actor(ctx.user_id().to_string())
                .correlation(ctx.correlation_id().to_string())
                .metadata(json!({ "query": query })),
        );

        let session = SessionVars::new(ctx.tenant_id().clone(), ctx.user_id(), ctx.request_id());
        Ok(self.inner.raw_query(&session, query).await?)
    }

    /// Applies a batch of writes atomically within the caller's tenant.
    ///
    /// Each operation is scoped exactly as its standalone counterpart:
    /// inserts are re-owned by the context's tenant, update and delete
    /// filters get the tenant predicate merged in.
    pub async fn execute_batch(
        &self,
        ctx: &TenantContext,
        ops: Vec<WriteOp>,
    ) -> CoreResult<()> {
        let tenant_id = ctx.tenant_id();
        let scoped: Vec<WriteOp> = ops
            .into_iter()
            .map(|op| match op {
                WriteOp::Insert { mut record } => {
                    record.tenant_id = tenant_id.clone();
                    if let Some(obj) = record.content.as_object_mut() {
                        obj.remove("tenant_id");
                    }
                    WriteOp::Insert { record }
                }
                WriteOp::Update {
                    collection,
                    filter,
                    mut patch,
                } => {
                    if let Some(obj) = patch.as_object_mut() {
                        obj.remove("tenant_id");
                    }
                    WriteOp::Update {
                        collection,
                        filter: filter.scoped_to(tenant_id),
                        patch,
                    }
                }
                WriteOp::Delete { collection, filter } => WriteOp::Delete {
                    collection,
                    filter: filter.scoped_to(tenant_id),
                },
            })
            .collect();

        let batch_size = scoped.len();
        let session = SessionVars::new(tenant_id.clone(), ctx.user_id(), ctx.request_id());
        self.inner.execute_batch(&session, scoped).await?;
        self.audit_write(ctx, "(batch)", "execute_batch", &format!("{batch_size} ops"));
        Ok(())
    }

    fn verify_row(
        &self,
        ctx: &TenantContext,
        collection: &str,
        operation: &str,
        record: &Record,
    ) -> Result<(), IsolationError> {
        if &record.tenant_id == ctx.tenant_id() {
            return Ok(());
        }
        let violation = IsolationError::CrossTenantRow {
            tenant_id: ctx.tenant_id().clone(),
            collection: collection.to_string(),
            operation: operation.to_string(),
        };
        error!(
            tenant_id = %ctx.tenant_id(),
            collection,
            operation,
            "cross-tenant row stopped by scoped-store re-check"
        );
        self.audit_violation(
            ctx,
            &violation,
            json!({
                "collection": collection,
                "operation": operation,
                "row_tenant": record.tenant_id.as_str(),
                "row_id": record.id,
            }),
        );
        Err(violation)
    }

    fn audit_violation(&self, ctx: &TenantContext, violation: &IsolationError, detail: Value) {
        self.audit.emit(
            SecurityEvent::new(
                AuditAction::IsolationViolation,
                AuditOutcome::Violation,
                Severity::Critical,
            )
            .tenant(ctx.tenant_id().clone())
            .actor(ctx.user_id().to_string())
            .correlation(ctx.correlation_id().to_string())
            .metadata(json!({
                "violation": violation.to_string(),
                "detail": detail,
            })),
        );
    }

    fn audit_read(&self, ctx: &TenantContext, collection: &str, operation: &str) {
        debug!(tenant_id = %ctx.tenant_id(), collection, operation, "scoped read");
        self.audit.emit(
            SecurityEvent::new(AuditAction::ScopedRead, AuditOutcome::Granted, Severity::Debug)
                .tenant(ctx.tenant_id().clone())
                .actor(ctx.user_id().to_string())
                .resource(collection, operation)
                .correlation(ctx.correlation_id().to_string()),
        );
    }

    fn audit_write(&self, ctx: &TenantContext, collection: &str, operation: &str, detail: &str) {
        self.audit.emit(
            SecurityEvent::new(AuditAction::ScopedWrite, AuditOutcome::Granted, Severity::Info)
                .tenant(ctx.tenant_id().clone())
                .actor(ctx.user_id().to_string())
                .resource(collection, operation)
                .correlation(ctx.correlation_id().to_string())
                .metadata(json!({ "detail": detail })),
        );
    }
}
