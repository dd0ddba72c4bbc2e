//! In-memory storage adapter.
//!
//! Used by tests and by deployments that want the full isolation stack
//! without an external backend. Predicates are evaluated against records
//! directly; there is no textual query language, so [`DataStore::raw_query`]
//! is unsupported here.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;

use super::client::{DataStore, SessionVars, WriteOp};
use super::filter::Filter;
use super::record::{Record, merge_patch};
use crate::error::{StoreError, StoreResult};
use crate::tenant::TenantId;

type Collections = HashMap<String, Vec<Record>>;
type Counters = HashMap<(String, String, String), u64>;

/// In-memory [`DataStore`] adapter.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    counters: RwLock<Counters>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn live_matches<'a>(
        collections: &'a Collections,
        collection: &str,
        filter: &'a Filter,
    ) -> impl Iterator<Item = &'a Record> {
        collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter(|r| !r.is_deleted())
            .filter(move |r| filter.matches(r))
    }

    fn apply_op(collections: &mut Collections, op: &WriteOp) -> StoreResult<()> {
        match op {
            WriteOp::Insert { record } => Self::insert_into(collections, record.clone()),
            WriteOp::Update {
                collection,
                filter,
                patch,
            } => {
                let rows = collections.entry(collection.clone()).or_default();
                for record in rows.iter_mut().filter(|r| !r.is_deleted()) {
                    if filter.matches(record) {
                        merge_patch(&mut record.content, patch);
                        record.updated_at = Utc::now();
                    }
                }
                Ok(())
            }
            WriteOp::Delete { collection, filter } => {
                let rows = collections.entry(collection.clone()).or_default();
                let now = Utc::now();
                for record in rows.iter_mut().filter(|r| !r.is_deleted()) {
                    if filter.matches(record) {
                        record.deleted_at = Some(now);
                        record.updated_at = now;
                    }
                }
                Ok(())
            }
        }
    }

    fn insert_into(collections: &mut Collections, record: Record) -> StoreResult<()> {
        let rows = collections.entry(record.collection.clone()).or_default();
        if rows
            .iter()
            .any(|r| r.id == record.id && r.tenant_id == record.tenant_id)
        {
            return Err(StoreError::QueryFailed {
                message: format!("duplicate record id in collection {}", record.collection),
            });
        }
        rows.push(record);
        Ok(())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Record>> {
        let collections = self.collections.read();
        Ok(Self::live_matches(&collections, collection, filter)
            .next()
            .cloned())
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Record>> {
        let collections = self.collections.read();
        let iter = Self::live_matches(&collections, collection, filter).cloned();
        Ok(match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        })
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let collections = self.collections.read();
        Ok(Self::live_matches(&collections, collection, filter).count() as u64)
    }

    async fn insert(&self, record: Record) -> StoreResult<Record> {
        let mut collections = self.collections.write();
        Self::insert_into(&mut collections, record.clone())?;
        Ok(record)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Value,
    ) -> StoreResult<Vec<Record>> {
        let mut collections = self.collections.write();
        let rows = collections.entry(collection.to_string()).or_default();
        let mut updated = Vec::new();
        for record in rows.iter_mut().filter(|r| !r.is_deleted()) {
            if filter.matches(record) {
                merge_patch(&mut record.content, patch);
                record.updated_at = Utc::now();
                updated.push(record.clone());
            }
        }
        Ok(updated)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let rows = collections.entry(collection.to_string()).or_default();
        let now = Utc::now();
        let mut deleted = 0;
        for record in rows.iter_mut().filter(|r| !r.is_deleted()) {
            if filter.matches(record) {
                record.deleted_at = Some(now);
                record.updated_at = now;
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn raw_query(&self, _session: &SessionVars, _query: &str) -> StoreResult<Vec<Value>> {
        Err(StoreError::QueryFailed {
            message: "raw queries are not supported by the memory backend".to_string(),
        })
    }

    async fn add_to_counter(
        &self,
        tenant_id: &TenantId,
        metric: &str,
        period: &str,
        delta: u64,
    ) -> StoreResult<u64> {
        let mut counters = self.counters.write();
        let key = (
            tenant_id.as_str().to_string(),
            metric.to_string(),
            period.to_string(),
        );
        let total = counters.entry(key).or_insert(0);
        *total = total.saturating_add(delta);
        Ok(*total)
    }

    async fn counters_for_period(
        &self,
        tenant_id: &TenantId,
        period: &str,
    ) -> StoreResult<HashMap<String, u64>> {
        let counters = self.counters.read();
        Ok(counters
            .iter()
            .filter(|((t, _, p), _)| t == tenant_id.as_str() && p == period)
            .map(|((_, metric, _), total)| (metric.clone(), *total))
            .collect())
    }

    async fn execute_batch(&self, _session: &SessionVars, ops: Vec<WriteOp>) -> StoreResult<()> {
        // Apply to a copy and swap on success, so a mid-batch failure leaves
        // nothing behind.
        let mut collections = self.collections.write();
        let mut staged = collections.clone();
        for op in &ops {
            Self::apply_op(&mut staged, op)?;
        }
        *collections = staged;
        Ok(())
    }
}
