//! Listener loop with graceful shutdown.

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;

use crate::error::{ApiError, ApiResult};

/// Serve `app` until `shutdown` resolves, then wait for open connections to
/// finish.
///
/// Every connection task holds a clone of the router (and through it the
/// event emitter), so the event worker can only drain after this returns.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> ApiResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))
}

/// Resolves on Ctrl-C. Never resolves if the signal handler cannot be
/// installed.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
