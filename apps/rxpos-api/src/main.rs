//! # Rx POS API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  till / dashboard ──► HTTP (8080) ──► services ──► SQLite              │
//! │                                           │                             │
//! │                                           ▼                             │
//! │                                    audit recorder                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Config path: `RXPOS_CONFIG`, else the first argument.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rxpos_api::audit::AuditRecorder;
use rxpos_api::auth::DbSessionAuthenticator;
use rxpos_api::config::ApiConfig;
use rxpos_api::{router, AppState};
use rxpos_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Rx POS API server...");

    let config_path = std::env::var_os("RXPOS_CONFIG")
        .map(PathBuf::from)
        .or_else(|| std::env::args_os().nth(1).map(PathBuf::from));
    let config = ApiConfig::load(config_path.as_deref()).context("loading configuration")?;
    info!(
        port = config.server.port,
        db_path = %config.database.path.display(),
        max_discount = ?config.sales.max_discount_percent,
        "Configuration loaded"
    );

    let db = Database::new(config.database.to_db_config())
        .await
        .context("opening database")?;
    info!("Database ready");

    let (recorder, writer) = AuditRecorder::spawn(db.clone(), config.audit.queue_capacity);

    let state = AppState::new(
        db.clone(),
        recorder,
        Arc::new(DbSessionAuthenticator::new(db.clone())),
        config.sales.max_discount_percent,
    );
    let app = router(state);

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "HTTP server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serving HTTP")?;

    // The router held the last recorder handles; the writer drains and exits.
    if let Err(e) = writer.await {
        error!(error = %e, "Audit writer task failed");
    }
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rxpos_api=debug,rxpos_db=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
