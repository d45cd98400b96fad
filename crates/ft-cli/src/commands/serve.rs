//! Serve command: runs the collector.

use std::sync::Arc;

use anyhow::{Context, Result};
use ft_db::Database;
use tokio::net::TcpListener;

use crate::server::{AppState, create_router};

/// Serves the collector on `listen_addr` until Ctrl-C.
pub async fn run(db: Database, listen_addr: &str) -> Result<()> {
    let app = create_router(Arc::new(AppState::new(db)));

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "collector listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(super::shutdown_signal())
        .await
        .context("collector server failed")?;

    tracing::info!("collector stopped");
    Ok(())
}
