//! Graceful shutdown orchestration.
//!
//! # Shutdown Sequence
//! 1. Stop accepting new connections
//! 2. Wait for in-flight requests to complete (drain)
//! 3. Close idle connections
//! 4. Stop background tasks
//! 5. Exit
//!
//! # Design Decisions
//! - Drain has timeout: force close after deadline
//! - In-flight requests get full timeout to complete
//! - Shutdown progress logged for debugging stuck shutdowns

use std::future::Future;

/// Wait for Ctrl-C (or the platform equivalent) and then run `on_shutdown`.
/// Intended to be raced against a pool's own long-running work via
/// `tokio::select!`, so the caller decides what "stop accepting, drain,
/// close" means for the pools it owns.
pub async fn wait_for_ctrl_c<F, Fut>(on_shutdown: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received, closing pools"),
        Err(err) => tracing::warn!(error = %err, "failed to listen for ctrl-c, shutting down anyway"),
    }
    on_shutdown().await;
}
