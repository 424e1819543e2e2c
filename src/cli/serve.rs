use crate::api::app_router;
use crate::core::config::AppConfig;
use crate::scheduler::start_daily_ingestion;
use crate::state::AppState;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Serves the HTTP API and, when enabled, the daily ingestion schedule.
pub async fn run(config: &AppConfig, state: Arc<AppState>) -> Result<()> {
    let scheduler = if config.schedule.enabled {
        let at = config.schedule.time_of_day()?;
        Some(start_daily_ingestion(Arc::clone(&state), at))
    } else {
        info!("Daily rate ingestion disabled");
        None
    };

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if let Some(handle) = scheduler {
        handle.abort();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, gracefully stopping...");
}
