//! Download, validate and install, as one unit.
//!
//! Used both at startup (before any handle is being served) and by the
//! periodic updater.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error_handling::UpdateError;
use crate::geoip::dataset::{DatasetHandle, DatasetLoader};
use crate::geoip::download::Downloader;
use crate::geoip::install::{install_candidate, open_installed};
use crate::geoip::validate::{validate_candidate, ProbeOutcome};

/// A newly installed dataset, opened from the canonical path.
#[derive(Debug)]
pub struct Provisioned {
    pub handle: DatasetHandle,
    pub probe: ProbeOutcome,
}

/// Drives a fresh dataset into the canonical path.
pub struct DatasetProvisioner {
    loader: Arc<dyn DatasetLoader>,
    downloader: Option<Downloader>,
    canonical: PathBuf,
}

impl DatasetProvisioner {
    /// `downloader` is `None` when no provider credential is configured.
    pub fn new(
        loader: Arc<dyn DatasetLoader>,
        downloader: Option<Downloader>,
        canonical: impl Into<PathBuf>,
    ) -> Self {
        Self {
            loader,
            downloader,
            canonical: canonical.into(),
        }
    }

    /// Canonical dataset path.
    pub fn canonical(&self) -> &Path {
        &self.canonical
    }

    /// Loader used for validation and reopening.
    pub fn loader(&self) -> &Arc<dyn DatasetLoader> {
        &self.loader
    }

    /// Whether downloads are possible at all.
    pub fn has_credential(&self) -> bool {
        self.downloader.is_some()
    }

    /// Downloads a candidate, validates it, installs it and reopens it.
    ///
    /// On any error the canonical file is untouched and the staging area is
    /// removed.
    pub async fn provision(&self) -> Result<Provisioned, UpdateError> {
        let downloader = self
            .downloader
            .as_ref()
            .ok_or(UpdateError::MissingCredential)?;

        log::info!("Starting GeoIP database download and verification");
        let candidate = downloader.fetch(&self.canonical).await?;

        let loader = Arc::clone(&self.loader);
        let canonical = self.canonical.clone();
        tokio::task::spawn_blocking(move || {
            let probe = validate_candidate(loader.as_ref(), candidate.path())?;
            install_candidate(candidate.path(), &canonical)?;
            drop(candidate);
            let handle = open_installed(loader.as_ref(), &canonical)?;
            Ok::<_, UpdateError>(Provisioned { handle, probe })
        })
        .await
        .map_err(|e| UpdateError::Task(e.to_string()))?
    }
}

impl std::fmt::Debug for DatasetProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetProvisioner")
            .field("canonical", &self.canonical)
            .field("has_credential", &self.has_credential())
            .finish_non_exhaustive()
    }
}
