//! Application state for the Castellan REST API.
//!
//! This module defines the shared application state that is available to all
//! request handlers: the scoped store, the context resolver, the entitlement
//! engine, the attack detector, the usage meter, and configuration.

use std::sync::Arc;

use castellan_core::audit::{AuditEmitter, AuditSink};
use castellan_core::entitlement::{EngineConfig, EntitlementEngine};
use castellan_core::guard::{AttackDetector, DetectorConfig};
use castellan_core::plan::{PlanRegistry, StoreSubscriptionDirectory};
use castellan_core::store::{DataStore, ScopedStore};
use castellan_core::tenant::{ContextResolver, StoreMembershipDirectory};
use castellan_core::usage::{StoreUsageMeter, UsageMeter};

use crate::config::ServerConfig;

/// Shared application state for the REST API.
///
/// Holds the fully wired isolation and entitlement pipeline. The only
/// storage handle handlers can reach is the scoped store; the raw backend is
/// consumed during wiring and never stored here.
///
/// # Example
///
/// ```rust,ignore
/// use castellan_rest::{AppState, ServerConfig};
/// use castellan_core::audit::InMemoryAuditSink;
/// use castellan_core::store::SqliteStore;
/// use std::sync::Arc;
///
/// let backend = Arc::new(SqliteStore::in_memory()?);
/// let sink = Arc::new(InMemoryAuditSink::new());
/// let state = AppState::new(backend, sink, ServerConfig::default());
/// ```
pub struct AppState {
    store: ScopedStore,
    resolver: Arc<ContextResolver>,
    engine: Arc<EntitlementEngine>,
    detector: Arc<AttackDetector>,
    meter: Arc<dyn UsageMeter>,
    config: Arc<ServerConfig>,
}

// Manually implement Clone; every field is an Arc or Arc-backed.
impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            resolver: Arc::clone(&self.resolver),
            engine: Arc::clone(&self.engine),
            detector: Arc::clone(&self.detector),
            meter: Arc::clone(&self.meter),
            config: Arc::clone(&self.config),
        }
    }
}

impl AppState {
    /// Wires the full pipeline over a backend and an audit sink.
    ///
    /// Memberships, subscriptions, and usage counters are read from the same
    /// backend the scoped store wraps, and every component shares one audit
    /// emitter.
    pub fn new(
        backend: Arc<dyn DataStore>,
        audit_sink: Arc<dyn AuditSink>,
        config: ServerConfig,
    ) -> Self {
        let audit = AuditEmitter::new(audit_sink);
        let meter: Arc<dyn UsageMeter> = Arc::new(StoreUsageMeter::new(backend.clone()));
        let resolver = Arc::new(ContextResolver::new(
            Arc::new(StoreMembershipDirectory::new(backend.clone())),
            audit.clone(),
        ));
        let engine = Arc::new(EntitlementEngine::new(
            Arc::new(PlanRegistry::builtin()),
            Arc::new(StoreSubscriptionDirectory::new(backend.clone())),
            meter.clone(),
            audit.clone(),
            EngineConfig::default(),
        ));
        let detector = Arc::new(AttackDetector::new(
            backend.clone(),
            audit.clone(),
            DetectorConfig::default(),
        ));
        let store = ScopedStore::new(backend, audit);

        Self {
            store,
            resolver,
            engine,
            detector,
            meter,
            config: Arc::new(config),
        }
    }

    /// Returns the tenant-scoped storage handle.
    pub fn store(&self) -> &ScopedStore {
        &self.store
    }

    /// Returns the fail-closed context resolver.
    pub fn resolver(&self) -> &ContextResolver {
        &self.resolver
    }

    /// Returns the entitlement engine.
    pub fn engine(&self) -> &Arc<EntitlementEngine> {
        &self.engine
    }

    /// Returns the attack detector.
    pub fn detector(&self) -> &AttackDetector {
        &self.detector
    }

    /// Returns the usage meter.
    pub fn meter(&self) -> &Arc<dyn UsageMeter> {
        &self.meter
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the base URL for the server.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Returns the default page size for list results.
    pub fn default_page_size(&self) -> usize {
        self.config.default_page_size
    }

    /// Returns the maximum page size for list results.
    pub fn max_page_size(&self) -> usize {
        self.config.max_page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castellan_core::audit::InMemoryAuditSink;
    use castellan_core::store::MemoryStore;

    fn state() -> AppState {
        AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(InMemoryAuditSink::new()),
            ServerConfig::for_testing(),
        )
    }

    #[tokio::test]
    async fn test_app_state_creation() {
        let state = state();
        assert_eq!(state.default_page_size(), 10);
        assert_eq!(state.store().backend().name(), "memory");
    }

    #[tokio::test]
    async fn test_app_state_clone() {
        let state = state();
        let cloned = state.clone();
        assert_eq!(state.base_url(), cloned.base_url());
    }
}
