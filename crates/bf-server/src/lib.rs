//! bf-server: HTTP API server for batch runners.
//!
//! This crate ties together all other bf-* crates into a running server
//! application. It provides:
//!
//! - Axum-based HTTP API for extensions and runners, with SSE
//! - Background sweeper that evicts settled runners after retention
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod router;
pub mod routes;
pub mod sweeper;

use std::net::SocketAddr;

use bf_core::config::Config;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Start the batchforge server.
///
/// Builds the [`AppContext`], spawns the runner sweeper and serves the HTTP
/// API. Returns when a shutdown signal is received; every runner still in
/// flight is stopped before returning.
pub async fn start(config: Config) -> bf_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let ctx = AppContext::new(config.clone());

    for info in ctx.tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::debug!("Tool not found: {}", info.name);
        }
    }

    let cancel = CancellationToken::new();

    let sweeper_ctx = ctx.clone();
    let sweeper_cancel = cancel.clone();
    let sweeper_handle = tokio::spawn(async move {
        sweeper::run_sweeper(sweeper_ctx, sweeper_cancel).await;
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| bf_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let app = router::build_router(ctx.clone());

    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| bf_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .map_err(|e| bf_core::Error::Internal(format!("Server error: {e}")))?;

    cancel.cancel();

    let stopped = ctx.registry.stop_all();
    if stopped > 0 {
        tracing::info!("Stopped {stopped} in-flight runner(s)");
    }

    let _ = sweeper_handle.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C, SIGTERM, or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
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
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
        _ = cancel.cancelled() => tracing::info!("Cancellation requested, shutting down"),
    }
}
