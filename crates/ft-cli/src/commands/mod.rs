//! CLI subcommand implementations.

pub mod report;
pub mod serve;
pub mod status;
pub mod track;

/// Resolves on Ctrl-C. Never resolves if the signal handler can't be installed.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
