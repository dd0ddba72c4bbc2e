//! SQLite storage adapter.
//!
//! The tenant column is part of the primary key on every table, so
//! `(tenant, collection, id)` uniqueness is enforced by the engine itself.
//! Structured filters compile to parameterized SQL; content fields resolve
//! through `json_extract`, and field names are whitelisted to
//! `[A-Za-z0-9_]` before they are spliced into the expression.
//!
//! SQLite has no server-side session variables, so [`SessionVars`] are
//! emulated with a connection-local temp table, re-established at the start
//! of every raw query and batch transaction. A pooled connection therefore
//! never carries a previous request's tenant into the next.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{DataStore, SessionVars, WriteOp};
use super::filter::{Condition, Filter, Op};
use super::record::{Record, merge_patch};
use crate::audit::{AuditSink, SecurityEvent};
use crate::error::{StoreError, StoreResult};
use crate::tenant::TenantId;

/// Configuration for the SQLite adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquisition timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Enable WAL mode for better concurrency.
    #[serde(default = "default_true")]
    pub enable_wal: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
        }
    }
}

/// SQLite [`DataStore`] adapter.
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("pool_state", &self.pool.state())
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Creates an in-memory store.
    ///
    /// The pool is pinned to a single connection so every caller sees the
    /// same database.
    pub fn in_memory() -> StoreResult<Self> {
        let mut config = SqliteConfig::default();
        config.max_connections = 1;
        config.enable_wal = false;
        Self::build(SqliteConnectionManager::memory(), config)
    }

    /// Opens or creates a file-based database.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::with_config(path, SqliteConfig::default())
    }

    /// Opens a file-based database with custom configuration.
    pub fn with_config<P: AsRef<Path>>(path: P, config: SqliteConfig) -> StoreResult<Self> {
        Self::build(SqliteConnectionManager::file(path.as_ref()), config)
    }

    fn build(manager: SqliteConnectionManager, config: SqliteConfig) -> StoreResult<Self> {
        let busy_timeout = config.busy_timeout_ms;
        let enable_wal = config.enable_wal;
        let manager = manager.with_init(move |conn| {
            conn.busy_timeout(Duration::from_millis(busy_timeout))?;
            if enable_wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .build(manager)
            .map_err(|e| StoreError::Unavailable {
                backend_name: "sqlite".to_string(),
                message: e.to_string(),
            })?;

        let store = Self { pool };
        let conn = store.conn()?;
        initialize_schema(&conn)?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(StoreError::from)
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Record>> {
        let conn = self.conn()?;
        Ok(query_records(&conn, collection, filter, Some(1))?.pop())
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Record>> {
        let conn = self.conn()?;
        query_records(&conn, collection, filter, limit)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let conn = self.conn()?;
        let mut args = vec![SqlValue::Text(collection.to_string())];
        let predicate = filter_sql(filter, &mut args)?;
        let sql = format!(
            "SELECT count(*) FROM records
             WHERE collection = ?1 AND deleted_at IS NULL AND {predicate}"
        );
        let count: i64 = conn.query_row(&sql, params_from_iter(args), |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn insert(&self, record: Record) -> StoreResult<Record> {
        let conn = self.conn()?;
        insert_record(&conn, &record)?;
        Ok(record)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Value,
    ) -> StoreResult<Vec<Record>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let updated = update_records(&tx, collection, filter, patch)?;
        tx.commit()?;
        Ok(updated)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let conn = self.conn()?;
        soft_delete_records(&conn, collection, filter)
    }

    async fn raw_query(&self, session: &SessionVars, query: &str) -> StoreResult<Vec<Value>> {
        let conn = self.conn()?;
        establish_session(&conn, session)?;
        let result = run_raw_query(&conn, query);
        clear_session(&conn)?;
        result
    }

    async fn add_to_counter(
        &self,
        tenant_id: &TenantId,
        metric: &str,
        period: &str,
        delta: u64,
    ) -> StoreResult<u64> {
        let conn = self.conn()?;
        // Single-statement upsert-and-add; concurrent callers serialize on
        // the row and no increment is lost.
        let total: i64 = conn.query_row(
            "INSERT INTO usage_counters (tenant_id, metric, period, quantity, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (tenant_id, metric, period)
             DO UPDATE SET quantity = quantity + excluded.quantity,
                           updated_at = excluded.updated_at
             RETURNING quantity",
            params![
                tenant_id.as_str(),
                metric,
                period,
                delta as i64,
                Utc::now().to_rfc3339(),
            ],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }

    async fn counters_for_period(
        &self,
        tenant_id: &TenantId,
        period: &str,
    ) -> StoreResult<HashMap<String, u64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT metric, quantity FROM usage_counters
             WHERE tenant_id = ?1 AND period = ?2",
        )?;
        let rows = stmt.query_map(params![tenant_id.as_str(), period], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counters = HashMap::new();
        for row in rows {
            let (metric, quantity) = row?;
            counters.insert(metric, quantity.max(0) as u64);
        }
        Ok(counters)
    }

    async fn execute_batch(&self, session: &SessionVars, ops: Vec<WriteOp>) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        // Session vars are re-established inside the transaction boundary.
        establish_session(&tx, session)?;
        for op in &ops {
            match op {
                WriteOp::Insert { record } => insert_record(&tx, record)?,
                WriteOp::Update {
                    collection,
                    filter,
                    patch,
                } => {
                    update_records(&tx, collection, filter, patch)?;
                }
                WriteOp::Delete { collection, filter } => {
                    soft_delete_records(&tx, collection, filter)?;
                }
            }
        }
        clear_session(&tx)?;
        tx.commit()?;
        Ok(())
    }
}

/// Creates the schema if it does not exist.
fn initialize_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS records (
            tenant_id TEXT NOT NULL,
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            PRIMARY KEY (tenant_id, collection, id)
        );
        CREATE INDEX IF NOT EXISTS idx_records_collection
            ON records (collection, tenant_id);

        CREATE TABLE IF NOT EXISTS usage_counters (
            tenant_id TEXT NOT NULL,
            metric TEXT NOT NULL,
            period TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (tenant_id, metric, period)
        );

        CREATE TABLE IF NOT EXISTS security_events (
            id TEXT PRIMARY KEY,
            tenant_id TEXT,
            actor_id TEXT,
            action TEXT NOT NULL,
            resource_type TEXT,
            resource_id TEXT,
            outcome TEXT NOT NULL,
            correlation_id TEXT,
            severity TEXT NOT NULL,
            metadata TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_security_events_tenant
            ON security_events (tenant_id, created_at);",
    )?;
    Ok(())
}

fn establish_session(conn: &Connection, session: &SessionVars) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TEMP TABLE IF NOT EXISTS session_vars (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        DELETE FROM session_vars;",
    )?;
    conn.execute(
        "INSERT INTO session_vars (name, value) VALUES
             ('tenant_id', ?1), ('user_id', ?2), ('request_id', ?3), ('service_account', ?4)",
        params![
            session.tenant_id.as_str(),
            session.user_id,
            session.request_id,
            if session.service_account { "1" } else { "0" },
        ],
    )?;
    Ok(())
}

fn clear_session(conn: &Connection) -> StoreResult<()> {
    conn.execute("DELETE FROM session_vars", [])?;
    Ok(())
}

fn run_raw_query(conn: &Connection, query: &str) -> StoreResult<Vec<Value>> {
    let mut stmt = conn.prepare(query).map_err(|e| StoreError::QueryFailed {
        message: e.to_string(),
    })?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = stmt.query([]).map_err(|e| StoreError::QueryFailed {
        message: e.to_string(),
    })?;
    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        let mut object = serde_json::Map::new();
        for (i, name) in columns.iter().enumerate() {
            object.insert(name.clone(), column_to_json(row.get_ref(i)?));
        }
        results.push(Value::Object(object));
    }
    Ok(results)
}

fn column_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

fn query_records(
    conn: &Connection,
    collection: &str,
    filter: &Filter,
    limit: Option<usize>,
) -> StoreResult<Vec<Record>> {
    let mut args = vec![SqlValue::Text(collection.to_string())];
    let predicate = filter_sql(filter, &mut args)?;
    let mut sql = format!(
        "SELECT collection, id, tenant_id, content, created_at, updated_at, deleted_at
         FROM records
         WHERE collection = ?1 AND deleted_at IS NULL AND {predicate}
         ORDER BY created_at, id"
    );
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {n}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args), row_to_record)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?.try_into_record()?);
    }
    Ok(records)
}

fn insert_record(conn: &Connection, record: &Record) -> StoreResult<()> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO records
                 (tenant_id, collection, id, content, created_at, updated_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.tenant_id.as_str(),
                record.collection,
                record.id,
                serde_json::to_string(&record.content)?,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
                record.deleted_at.map(|t| t.to_rfc3339()),
            ],
        )?;
    if inserted == 0 {
        return Err(StoreError::QueryFailed {
            message: format!("duplicate record id in collection {}", record.collection),
        });
    }
    Ok(())
}

fn update_records(
    conn: &Connection,
    collection: &str,
    filter: &Filter,
    patch: &Value,
) -> StoreResult<Vec<Record>> {
    // The merge is done in process; each matching row is rewritten by key.
    let matched = query_records(conn, collection, filter, None)?;
    let now = Utc::now();
    let mut updated = Vec::with_capacity(matched.len());
    for mut record in matched {
        merge_patch(&mut record.content, patch);
        record.updated_at = now;
        conn.execute(
            "UPDATE records SET content = ?1, updated_at = ?2
             WHERE tenant_id = ?3 AND collection = ?4 AND id = ?5",
            params![
                serde_json::to_string(&record.content)?,
                record.updated_at.to_rfc3339(),
                record.tenant_id.as_str(),
                record.collection,
                record.id,
            ],
        )?;
        updated.push(record);
    }
    Ok(updated)
}

fn soft_delete_records(conn: &Connection, collection: &str, filter: &Filter) -> StoreResult<u64> {
    let mut args = vec![SqlValue::Text(collection.to_string())];
    let predicate = filter_sql(filter, &mut args)?;
    let now = Utc::now().to_rfc3339();
    let sql = format!(
        "UPDATE records SET deleted_at = '{now}', updated_at = '{now}'
         WHERE collection = ?1 AND deleted_at IS NULL AND {predicate}"
    );
    let changed = conn.execute(&sql, params_from_iter(args))?;
    Ok(changed as u64)
}

struct RawRow {
    collection: String,
    id: String,
    tenant_id: String,
    content: String,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        collection: row.get(0)?,
        id: row.get(1)?,
        tenant_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        deleted_at: row.get(6)?,
    })
}

impl RawRow {
    fn try_into_record(self) -> StoreResult<Record> {
        let tenant_id =
            TenantId::parse(&self.tenant_id).map_err(|_| StoreError::Serialization {
                message: format!("stored tenant identifier is malformed: {}", self.tenant_id),
            })?;
        Ok(Record {
            collection: self.collection,
            id: self.id,
            tenant_id,
            content: serde_json::from_str(&self.content)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            deleted_at: self.deleted_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

fn parse_timestamp(text: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization {
            message: format!("invalid stored timestamp: {e}"),
        })
}

/// Compiles a filter into a SQL predicate, pushing bind values into `args`.
fn filter_sql(filter: &Filter, args: &mut Vec<SqlValue>) -> StoreResult<String> {
    let mut clauses = Vec::new();
    for condition in &filter.all {
        clauses.push(condition_sql(condition, args)?);
    }
    if !filter.any.is_empty() {
        let mut branches = Vec::new();
        for branch in &filter.any {
            branches.push(filter_sql(branch, args)?);
        }
        clauses.push(format!("({})", branches.join(" OR ")));
    }
    if clauses.is_empty() {
        return Ok("1 = 1".to_string());
    }
    Ok(format!("({})", clauses.join(" AND ")))
}

fn condition_sql(condition: &Condition, args: &mut Vec<SqlValue>) -> StoreResult<String> {
    let column = column_expr(&condition.field)?;
    let op = match condition.op {
        Op::Eq => "=",
        Op::Ne => "<>",
        Op::Lt => "<",
        Op::Lte => "<=",
        Op::Gt => ">",
        Op::Gte => ">=",
    };
    args.push(bind_value(&condition.value)?);
    Ok(format!("{column} {op} ?{}", args.len()))
}

/// Maps a filter field to a SQL expression.
///
/// Metadata columns map directly; anything else resolves inside the content
/// document. The name is whitelisted before splicing, so a field can never
/// smuggle SQL into the expression.
fn column_expr(field: &str) -> StoreResult<String> {
    match field {
        "id" => Ok("id".to_string()),
        "tenant_id" => Ok("tenant_id".to_string()),
        other => {
            if other.is_empty()
                || !other.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(StoreError::QueryFailed {
                    message: format!("invalid filter field name: {other}"),
                });
            }
            Ok(format!("json_extract(content, '$.{other}')"))
        }
    }
}

fn bind_value(value: &Value) -> StoreResult<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                return Err(StoreError::Serialization {
                    message: format!("unrepresentable number in filter: {n}"),
                });
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(serde_json::to_string(other)?),
    })
}

/// Append-only audit sink writing to the `security_events` table.
///
/// Shares the store's connection pool. Events are inserted once and never
/// updated or deleted.
pub struct SqliteAuditSink {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAuditSink {
    /// Creates a sink over the same database as the given store.
    pub fn new(store: &SqliteStore) -> Self {
        Self {
            pool: store.pool.clone(),
        }
    }
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
    async fn append(&self, event: SecurityEvent) -> StoreResult<()> {
        let conn = self.pool.get().map_err(StoreError::from)?;
        conn.execute(
            "INSERT INTO security_events
                 (id, tenant_id, actor_id, action, resource_type, resource_id,
                  outcome, correlation_id, severity, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                event.id.to_string(),
                event.tenant_id.as_ref().map(|t| t.as_str().to_string()),
                event.actor_id,
                event.action.as_str(),
                event.resource_type,
                event.resource_id,
                serde_json::to_string(&event.outcome)?,
                event.correlation_id,
                serde_json::to_string(&event.severity)?,
                serde_json::to_string(&event.metadata)?,
                event.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditAction, AuditOutcome, Severity};
    use serde_json::json;

    fn session(tenant: &TenantId) -> SessionVars {
        SessionVars::new(tenant.clone(), "user-1", "req-1")
    }

    #[tokio::test]
    async fn test_insert_find_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::generate();
        store
            .insert(Record::new("items", "i-1", tenant.clone(), json!({"n": 1})))
            .await
            .unwrap();

        let found = store
            .find_one("items", &Filter::by("id", "i-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.tenant_id, tenant);
        assert_eq!(found.content, json!({"n": 1}));
    }

    #[tokio::test]
    async fn test_duplicate_insert_fails() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::generate();
        let record = Record::new("items", "i-1", tenant.clone(), json!({}));
        store.insert(record.clone()).await.unwrap();
        assert!(store.insert(record).await.is_err());
    }

    #[tokio::test]
    async fn test_same_id_in_two_tenants_allowed() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant_a = TenantId::generate();
        let tenant_b = TenantId::generate();
        store
            .insert(Record::new("items", "i-1", tenant_a, json!({})))
            .await
            .unwrap();
        store
            .insert(Record::new("items", "i-1", tenant_b, json!({})))
            .await
            .unwrap();
        assert_eq!(store.count("items", &Filter::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_json_field_filter() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::generate();
        store
            .insert(Record::new("items", "a", tenant.clone(), json!({"qty": 5})))
            .await
            .unwrap();
        store
            .insert(Record::new("items", "b", tenant.clone(), json!({"qty": 15})))
            .await
            .unwrap();

        let filter = Filter::new().and(Condition {
            field: "qty".to_string(),
            op: Op::Gte,
            value: json!(10),
        });
        let rows = store.find_many("items", &filter, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "b");
    }

    #[tokio::test]
    async fn test_hostile_field_name_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let filter = Filter::by("qty') OR 1=1 --", 1);
        let err = store.find_many("items", &filter, None).await.unwrap_err();
        assert!(matches!(err, StoreError::QueryFailed { .. }));
    }

    #[tokio::test]
    async fn test_soft_delete_and_update() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::generate();
        store
            .insert(Record::new("items", "i-1", tenant.clone(), json!({"a": 1})))
            .await
            .unwrap();

        let updated = store
            .update_many("items", &Filter::new(), &json!({"a": 2, "b": 3}))
            .await
            .unwrap();
        assert_eq!(updated[0].content, json!({"a": 2, "b": 3}));

        assert_eq!(store.delete_many("items", &Filter::new()).await.unwrap(), 1);
        assert_eq!(store.count("items", &Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_counter_upsert_add() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::generate();
        assert_eq!(
            store.add_to_counter(&tenant, "api_calls", "2026-08", 3).await.unwrap(),
            3
        );
        assert_eq!(
            store.add_to_counter(&tenant, "api_calls", "2026-08", 4).await.unwrap(),
            7
        );
        let counters = store.counters_for_period(&tenant, "2026-08").await.unwrap();
        assert_eq!(counters.get("api_calls"), Some(&7));
    }

    #[tokio::test]
    async fn test_raw_query_sees_session_vars() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::generate();
        let rows = store
            .raw_query(
                &session(&tenant),
                "SELECT value AS tenant_id FROM session_vars WHERE name = 'tenant_id'",
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["tenant_id"], json!(tenant.as_str()));
    }

    #[tokio::test]
    async fn test_batch_rolls_back_on_failure() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::generate();
        store
            .insert(Record::new("items", "i-1", tenant.clone(), json!({})))
            .await
            .unwrap();

        let ops = vec![
            WriteOp::Insert {
                record: Record::new("items", "i-2", tenant.clone(), json!({})),
            },
            WriteOp::Insert {
                record: Record::new("items", "i-1", tenant.clone(), json!({})),
            },
        ];
        assert!(store.execute_batch(&session(&tenant), ops).await.is_err());
        assert_eq!(store.count("items", &Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_audit_sink_appends() {
        let store = SqliteStore::in_memory().unwrap();
        let sink = SqliteAuditSink::new(&store);
        let tenant = TenantId::generate();
        sink.append(
            SecurityEvent::new(
                AuditAction::EntitlementDenied,
                AuditOutcome::Denied,
                Severity::Warning,
            )
            .tenant(tenant.clone()),
        )
        .await
        .unwrap();

        let rows = store
            .raw_query(
                &session(&tenant),
                "SELECT action FROM security_events WHERE tenant_id IS NOT NULL",
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["action"], json!("entitlement_denied"));
    }
}
