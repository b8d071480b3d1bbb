//! Startup: make sure a dataset exists and open it.

use crate::error_handling::StartupError;
use crate::geoip::dataset::DatasetHandle;
use crate::geoip::freshness::needs_update;
use crate::geoip::pipeline::DatasetProvisioner;

/// Produces the first handle to serve.
///
/// If the canonical file is missing, stale or `force` is set, an update is
/// attempted first. Startup only fails when no usable file is left:
///
/// - update needed, no credential, no file: [`StartupError::NoDatasetNoCredential`]
/// - update failed and no file exists: [`StartupError::InitialUpdate`]
/// - the file that is left cannot be opened: [`StartupError::Open`]
///
/// Otherwise a failed or impossible update is logged and the existing file
/// is served.
pub async fn load_initial_dataset(
    provisioner: &DatasetProvisioner,
    force: bool,
    threshold_hours: u64,
) -> Result<DatasetHandle, StartupError> {
    let canonical = provisioner.canonical();

    if needs_update(canonical, force, threshold_hours) {
        if !provisioner.has_credential() {
            if !canonical.exists() {
                return Err(StartupError::NoDatasetNoCredential(canonical.to_path_buf()));
            }
            log::error!(
                "MAXMIND_LICENSE_KEY not set, cannot update GeoIP database; using existing file {}",
                canonical.display()
            );
        } else {
            match provisioner.provision().await {
                Ok(provisioned) => {
                    log::info!("GeoIP database downloaded, verified, and installed");
                    return Ok(provisioned.handle);
                }
                Err(e) if canonical.exists() => log::error!(
                    "Failed to update GeoIP database, continuing with existing file: {}",
                    e
                ),
                Err(e) => return Err(StartupError::InitialUpdate(e)),
            }
        }
    } else {
        log::info!("GeoIP database is up to date");
    }

    let loader = std::sync::Arc::clone(provisioner.loader());
    let path = canonical.to_path_buf();
    tokio::task::spawn_blocking(move || DatasetHandle::open(loader.as_ref(), &path))
        .await
        .map_err(|e| StartupError::Task(e.to_string()))?
        .map_err(StartupError::Open)
}
