//! Castellan server
//!
//! Multi-tenant isolation and entitlement API server.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use castellan_rest::{AppState, ServerConfig, create_app, init_logging};

#[cfg(feature = "sqlite")]
use castellan_core::store::{SqliteAuditSink, SqliteStore};

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        "Starting Castellan server"
    );

    start(config).await
}

/// Starts the server over the SQLite backend.
///
/// Audit events go to the `security_events` table of the same database, so
/// a deployment's audit trail survives restarts alongside its data.
#[cfg(feature = "sqlite")]
async fn start(config: ServerConfig) -> anyhow::Result<()> {
    let store = match config.database_url.as_deref() {
        Some(path) if path != ":memory:" => {
            info!(database = %path, "Initializing SQLite backend");
            SqliteStore::open(path)?
        }
        _ => {
            info!("Initializing in-memory SQLite backend");
            SqliteStore::in_memory()?
        }
    };
    let audit_sink = Arc::new(SqliteAuditSink::new(&store));

    let state = AppState::new(Arc::new(store), audit_sink, config.clone());
    state.engine().spawn_sweeper();

    let app = create_app(state);
    serve(app, &config).await
}

/// Fallback when the sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
async fn start(config: ServerConfig) -> anyhow::Result<()> {
    use castellan_core::audit::InMemoryAuditSink;
    use castellan_core::store::MemoryStore;

    info!("Initializing in-memory backend (no sqlite feature)");
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(InMemoryAuditSink::new()),
        config.clone(),
    );
    state.engine().spawn_sweeper();

    let app = create_app(state);
    serve(app, &config).await
}
