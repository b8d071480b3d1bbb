//! Publishing a validated candidate to the canonical path.

use std::path::Path;

use crate::error_handling::InstallError;
use crate::geoip::dataset::{DatasetHandle, DatasetLoader};

/// Moves the candidate at `candidate` to `canonical` with a single rename.
///
/// The destination directory is created if missing. The rename replaces any
/// existing file atomically, so a concurrent opener sees either the old file
/// or the complete new one.
pub fn install_candidate(candidate: &Path, canonical: &Path) -> Result<(), InstallError> {
    if let Some(dir) = canonical.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| InstallError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    log::debug!(
        "Moving verified database from {} to {}",
        candidate.display(),
        canonical.display()
    );
    std::fs::rename(candidate, canonical).map_err(|source| InstallError::Rename {
        from: candidate.to_path_buf(),
        to: canonical.to_path_buf(),
        source,
    })?;

    log::debug!("Database file successfully updated at {}", canonical.display());
    Ok(())
}

/// Opens the freshly installed canonical file, re-detecting its kind.
pub fn open_installed(
    loader: &dyn DatasetLoader,
    canonical: &Path,
) -> Result<DatasetHandle, InstallError> {
    DatasetHandle::open(loader, canonical).map_err(InstallError::Reopen)
}
