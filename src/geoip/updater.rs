//! Update runs and the periodic updater.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error_handling::UpdateError;
use crate::geoip::freshness::needs_update;
use crate::geoip::manager::DatasetManager;
use crate::geoip::pipeline::{DatasetProvisioner, Provisioned};
use crate::geoip::types::DatasetKind;
use crate::geoip::validate::ProbeOutcome;

/// What an update run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The dataset was fresh; nothing was downloaded.
    UpToDate,
    /// A new dataset was installed and swapped in.
    Updated {
        kind: DatasetKind,
        probe: ProbeOutcome,
    },
}

/// Checks freshness and, when needed, replaces the served dataset.
#[derive(Debug)]
pub struct Updater {
    provisioner: DatasetProvisioner,
    manager: Arc<DatasetManager>,
    threshold_hours: u64,
}

impl Updater {
    pub fn new(
        provisioner: DatasetProvisioner,
        manager: Arc<DatasetManager>,
        threshold_hours: u64,
    ) -> Self {
        Self {
            provisioner,
            manager,
            threshold_hours,
        }
    }

    pub fn manager(&self) -> &Arc<DatasetManager> {
        &self.manager
    }

    /// Runs one update.
    ///
    /// Makes no network call when the dataset is fresh and `force` is unset.
    /// On failure the served handle and the canonical file are unchanged.
    pub async fn run_update(&self, force: bool) -> Result<UpdateOutcome, UpdateError> {
        if !needs_update(self.provisioner.canonical(), force, self.threshold_hours) {
            return Ok(UpdateOutcome::UpToDate);
        }

        let Provisioned { handle, probe } = self.provisioner.provision().await?;
        let kind = handle.kind();
        // The old handle is released once in-flight queries finish with it.
        drop(self.manager.swap(handle));

        log::info!("GeoIP database updated successfully (type: {})", kind);
        Ok(UpdateOutcome::Updated { kind, probe })
    }

    async fn periodic_check(&self) {
        log::info!("Running periodic database update check");
        match self.run_update(false).await {
            Ok(UpdateOutcome::UpToDate) => log::info!("GeoIP database is up to date"),
            Ok(UpdateOutcome::Updated { .. }) => {}
            Err(e) => log::error!("Failed to update database: {}", e),
        }
    }
}

/// Starts the periodic updater.
///
/// Returns `None` without spawning anything when `interval_hours` is 0.
/// The task exits once `shutdown` is cancelled; an update that is already
/// running finishes first.
pub fn spawn_updater(
    updater: Arc<Updater>,
    interval_hours: u64,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    if interval_hours == 0 {
        log::info!("Periodic database updates disabled (DB_UPDATE_INTERVAL_HOURS=0)");
        return None;
    }
    log::info!(
        "Starting periodic database updater (interval: {} hours)",
        interval_hours
    );
    let period = Duration::from_secs(interval_hours.saturating_mul(3600));
    Some(tokio::spawn(run_periodic(updater, period, shutdown)))
}

/// Update loop. The first check runs one full `period` after start.
pub(crate) async fn run_periodic(
    updater: Arc<Updater>,
    period: Duration,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                log::info!("Periodic database updater stopped");
                break;
            }
            _ = tokio::time::sleep(period) => {
                updater.periodic_check().await;
            }
        }
    }
}
