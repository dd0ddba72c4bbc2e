//! Castellan Tenant Isolation and Entitlement Core
//!
//! This crate provides the tenant-isolation and entitlement-enforcement core
//! for a multi-tenant service: mandatory tenant contexts, a scoped storage
//! decorator that makes cross-tenant access structurally impossible, attack
//! detection over resource identifiers, and plan-based entitlement checks
//! with usage metering.
//!
//! # Architecture
//!
//! - [`tenant`] - tenant identifiers, contexts, memberships, and the
//!   fail-closed context resolver
//! - [`store`] - structured filters, the narrow data-access interface, the
//!   tenant-scoping decorator, and the memory/SQLite adapters
//! - [`guard`] - identifier validation, enumeration and bulk-probe
//!   detection, rate limiting, ownership checks, error sanitization
//! - [`plan`] - tiers, entitlements, the immutable plan registry,
//!   subscriptions
//! - [`usage`] - billing periods and atomic usage counters
//! - [`entitlement`] - the decision engine with its TTL cache
//! - [`audit`] - fire-and-forget security-event emission
//! - [`error`] - the error taxonomy with stable machine-readable codes
//!
//! # Control flow
//!
//! An inbound request is resolved to a [`tenant::TenantContext`] by the
//! [`tenant::ContextResolver`]; the handler asks the
//! [`entitlement::EntitlementEngine`] whether the action may proceed; if
//! granted, all storage access goes through a [`store::ScopedStore`], with
//! the [`guard::AttackDetector`] inspecting identifiers in-line. Every
//! decision point emits to the [`audit::AuditEmitter`].
//!
//! # Backend features
//!
//! - `sqlite` (default) - SQLite adapter with in-memory and file modes
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use castellan_core::audit::{AuditEmitter, InMemoryAuditSink};
//! use castellan_core::store::{MemoryStore, ScopedStore, Filter};
//! use castellan_core::tenant::{TenantContext, TenantId};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let audit = AuditEmitter::new(Arc::new(InMemoryAuditSink::new()));
//! let store = ScopedStore::new(Arc::new(MemoryStore::new()), audit);
//!
//! // Contexts normally come from the resolver; every operation takes one.
//! let ctx = TenantContext::new(TenantId::generate(), "user-1", "req-1", "corr-1");
//! let rows = store.find_many(&ctx, "companies", Filter::new(), None).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod audit;
pub mod entitlement;
pub mod error;
pub mod guard;
pub mod plan;
pub mod store;
pub mod tenant;
pub mod usage;

pub use error::{CoreError, CoreResult, StoreError, StoreResult};
