//! SMD2 API server entry point.

use std::time::Duration;

use axum::Router;
use smd_api::telemetry::init_tracing;
use smd_api::{
    create_api_router, serve, shutdown_signal, ApiConfig, ApiError, ApiResult, AppState,
};

/// How long queued lifecycle events get to drain on shutdown.
const EVENT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ApiConfig::from_env();
    init_tracing(config.log_format)?;

    let (state, event_worker) = AppState::from_config(&config).await?;
    let app: Router = create_api_router(state, &config);

    let addr = config.socket_addr()?;
    tracing::info!(%addr, store = %config.store, "Starting SMD2 API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    serve(listener, app, shutdown_signal()).await?;

    // the worker stops once the last emitter handle is gone
    match tokio::time::timeout(EVENT_DRAIN_TIMEOUT, event_worker).await {
        Ok(Ok(())) => tracing::info!("Lifecycle event queue drained"),
        Ok(Err(e)) => tracing::warn!(error = %e, "Event worker ended abnormally"),
        Err(_) => tracing::warn!("Gave up waiting for queued lifecycle events"),
    }
    Ok(())
}
