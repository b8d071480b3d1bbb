//! Server lifecycle: startup, serving, and graceful shutdown.

mod init;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::app::{shutdown_gracefully, wait_for_shutdown_signal};
use crate::config::{Config, SHUTDOWN_TIMEOUT};
use crate::geoip::{spawn_updater, DatasetLoader, MaxMindLoader};
use crate::server::{self, AppState};

pub use init::{build_provisioner, init_server_resources, ServerResources};

/// Runs the GeoIP API until SIGINT/SIGTERM.
///
/// Startup fails if no usable dataset can be loaded. After a shutdown signal
/// the server stops accepting connections and gets up to 30 seconds to drain;
/// the periodic updater is then stopped.
///
/// # Example
///
/// ```no_run
/// use geoip_api::{run_server, Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let mut config = Config::default();
/// config.dataset.path = "./GeoLite2-City.mmdb".into();
/// config.dataset.license_key = std::env::var("MAXMIND_LICENSE_KEY").ok();
/// run_server(config).await
/// # }
/// ```
pub async fn run_server(config: Config) -> Result<()> {
    run_server_with(config, Arc::new(MaxMindLoader)).await
}

/// [`run_server`] with a custom dataset loader.
pub async fn run_server_with(config: Config, loader: Arc<dyn DatasetLoader>) -> Result<()> {
    let resources = init_server_resources(&config, loader).await?;
    let listener = server::bind(config.port).await?;

    let cancel = CancellationToken::new();
    let updater_task = spawn_updater(
        Arc::clone(&resources.updater),
        config.dataset.update_interval_hours,
        cancel.child_token(),
    );
    let state = AppState {
        service: Arc::clone(&resources.service),
    };
    let mut server_task = tokio::spawn(server::serve(listener, state, cancel.child_token()));

    tokio::select! {
        _ = wait_for_shutdown_signal() => {}
        joined = &mut server_task => {
            cancel.cancel();
            joined.context("HTTP server task failed")??;
            anyhow::bail!("HTTP server stopped unexpectedly");
        }
    }

    log::info!("Shutting down server...");
    cancel.cancel();
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut server_task).await {
        Ok(joined) => joined.context("HTTP server task failed")??,
        Err(_) => {
            log::error!(
                "Server did not drain within {:?}, forcing shutdown",
                SHUTDOWN_TIMEOUT
            );
            server_task.abort();
        }
    }

    let background: Vec<_> = updater_task
        .map(|task| ("Periodic database updater", task))
        .into_iter()
        .collect();
    shutdown_gracefully(cancel, background, SHUTDOWN_TIMEOUT).await;

    log::info!("Server exited");
    Ok(())
}
