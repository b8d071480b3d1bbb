//! Server resource initialization.
//!
//! Everything that has to exist before the first request is accepted: the
//! download client, the initial dataset handle, the manager owning it, the
//! query service, and the updater that will replace it later.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Config, DatasetConfig};
use crate::error_handling::InitializationError;
use crate::geoip::{
    load_initial_dataset, DatasetLoader, DatasetManager, DatasetProvisioner, Downloader, Updater,
};
use crate::initialization::init_download_client;
use crate::query::QueryService;

/// Long-lived resources shared by the server and the updater.
pub struct ServerResources {
    pub service: Arc<QueryService>,
    pub updater: Arc<Updater>,
}

/// Builds the provisioner for `dataset`. Without a license key it can still
/// open the existing file but never downloads.
pub fn build_provisioner(
    dataset: &DatasetConfig,
    loader: Arc<dyn DatasetLoader>,
) -> Result<DatasetProvisioner, InitializationError> {
    let downloader = match &dataset.license_key {
        Some(key) => Some(Downloader::new(
            init_download_client()?,
            dataset.download_base_url.as_str(),
            key.as_str(),
        )),
        None => {
            log::warn!("MAXMIND_LICENSE_KEY not set, automatic database updates are disabled");
            None
        }
    };
    Ok(DatasetProvisioner::new(loader, downloader, dataset.path.clone()))
}

/// Loads the initial dataset and wires up the query service and updater.
///
/// # Errors
///
/// Fails when no usable dataset can be opened (see
/// [`load_initial_dataset`]) or the HTTP client cannot be built.
pub async fn init_server_resources(
    config: &Config,
    loader: Arc<dyn DatasetLoader>,
) -> Result<ServerResources> {
    log::info!("Using GeoIP database path: {}", config.dataset.path.display());

    let provisioner = build_provisioner(&config.dataset, loader)
        .context("Failed to initialize download client")?;
    let handle = load_initial_dataset(
        &provisioner,
        config.dataset.force_update,
        config.dataset.update_interval_hours,
    )
    .await
    .context("Failed to load GeoIP database")?;

    let manager = Arc::new(DatasetManager::new(handle));
    let service = Arc::new(QueryService::new(
        Arc::clone(&manager),
        config.cache_enabled,
        config.cache_capacity,
    ));
    let updater = Arc::new(Updater::new(
        provisioner,
        manager,
        config.dataset.update_interval_hours,
    ));

    Ok(ServerResources { service, updater })
}
