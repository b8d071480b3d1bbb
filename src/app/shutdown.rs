//! Graceful shutdown handling.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Waits for SIGINT or SIGTERM (Ctrl+C elsewhere).
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => log::info!("Received SIGTERM"),
                    _ = tokio::signal::ctrl_c() => log::info!("Received SIGINT"),
                }
            }
            Err(e) => {
                log::warn!("Failed to register SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Cancels background work and waits for each task, giving up on a task
/// after `timeout`.
pub async fn shutdown_gracefully(
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    timeout: Duration,
) {
    cancel.cancel();
    for (name, task) in tasks {
        let abort = task.abort_handle();
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(())) => log::debug!("{} stopped", name),
            Ok(Err(e)) => log::warn!("{} ended abnormally: {}", name, e),
            Err(_) => {
                log::warn!("{} did not stop within {:?}, aborting", name, timeout);
                abort.abort();
            }
        }
    }
}
