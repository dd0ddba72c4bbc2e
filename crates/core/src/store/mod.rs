//! Tenant-scoped storage.
//!
//! Application code holds a [`ScopedStore`], never a bare adapter. The
//! layering is:
//!
//! 1. [`Filter`] - structured predicates, mechanically scopeable
//! 2. [`DataStore`] - the narrow adapter interface (memory, SQLite)
//! 3. [`ScopedStore`] - the decorator that injects the tenant predicate,
//!    forces ownership on creation, guards raw queries, and re-checks every
//!    returned row

mod client;
mod filter;
mod memory;
mod raw;
mod record;
mod scoped;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use client::{DataStore, SessionVars, WriteOp};
pub use filter::{Condition, Filter, Op};
pub use memory::MemoryStore;
pub use raw::RawQueryGuard;
pub use record::Record;
pub use scoped::ScopedStore;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteAuditSink, SqliteConfig, SqliteStore};
