//! Freshness policy.
//!
//! The dataset file's modification time is the only persisted freshness
//! signal; no version or metadata file is kept next to it.

use std::path::Path;
use std::time::{Duration, SystemTime};

/// Why a dataset does or does not need an update.
#[derive(Debug, Clone, PartialEq)]
pub enum Freshness {
    /// No file at the canonical path.
    Missing,
    /// Update forced by configuration.
    Forced,
    /// File metadata could not be read.
    Unreadable(String),
    /// File is older than the threshold.
    Stale { age_hours: f64 },
    /// File is recent enough, or periodic checks are disabled.
    Fresh { age_hours: f64 },
}

impl Freshness {
    /// Whether this state calls for a download.
    pub fn needs_update(&self) -> bool {
        !matches!(self, Freshness::Fresh { .. })
    }
}

/// Evaluates the dataset at `path`.
///
/// A threshold of 0 disables age-based staleness; a missing file or the force
/// flag still trigger an update.
pub fn check_freshness(path: &Path, force: bool, threshold_hours: u64) -> Freshness {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Freshness::Missing,
        Err(e) => return Freshness::Unreadable(e.to_string()),
    };
    if force {
        return Freshness::Forced;
    }
    let modified = match metadata.modified() {
        Ok(modified) => modified,
        Err(e) => return Freshness::Unreadable(e.to_string()),
    };

    // A modification time in the future counts as age zero.
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    let age_hours = age.as_secs_f64() / 3600.0;

    if threshold_hours > 0 && age > Duration::from_secs(threshold_hours.saturating_mul(3600)) {
        Freshness::Stale { age_hours }
    } else {
        Freshness::Fresh { age_hours }
    }
}

/// Decides whether the dataset at `path` needs an update, logging the reason.
pub fn needs_update(path: &Path, force: bool, threshold_hours: u64) -> bool {
    let freshness = check_freshness(path, force, threshold_hours);
    match &freshness {
        Freshness::Missing => log::info!("GeoIP database not found at {}", path.display()),
        Freshness::Forced => log::info!("FORCE_DB_UPDATE is true, forcing database update"),
        Freshness::Unreadable(e) => {
            log::error!("Failed to get file info for {}: {}", path.display(), e)
        }
        Freshness::Stale { age_hours } => log::info!(
            "GeoIP database at {} is {:.1} hours old (threshold: {} hours), update needed",
            path.display(),
            age_hours,
            threshold_hours
        ),
        Freshness::Fresh { age_hours } => log::debug!(
            "GeoIP database at {} is up to date (age: {:.1} hours, threshold: {} hours)",
            path.display(),
            age_hours,
            threshold_hours
        ),
    }
    freshness.needs_update()
}
