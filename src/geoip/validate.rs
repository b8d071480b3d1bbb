//! Candidate validation.
//!
//! Stage one opens the candidate as a dataset; stage two runs a known-answer
//! probe. Only an open or lookup failure rejects the candidate. An
//! unexpected probe answer is logged as a warning and the candidate is kept.

use std::path::Path;

use crate::config::{PROBE_EXPECTED_COUNTRY, PROBE_IP};
use crate::error_handling::ValidationError;
use crate::geoip::dataset::{DatasetHandle, DatasetLoader};

/// Result of the known-answer probe on an accepted candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The probe address resolved to the expected country.
    Matched,
    /// The probe address resolved to something else, or to nothing.
    Mismatch { found: Option<String> },
}

/// Validates the candidate at `path`.
///
/// The probe handle is dropped before returning so the file can be moved.
pub fn validate_candidate(
    loader: &dyn DatasetLoader,
    path: &Path,
) -> Result<ProbeOutcome, ValidationError> {
    log::debug!("Verifying downloaded database: {}", path.display());

    let handle = DatasetHandle::open(loader, path).map_err(ValidationError::Open)?;
    let found = handle
        .country(PROBE_IP)
        .map_err(|source| ValidationError::Probe {
            ip: PROBE_IP,
            source,
        })?;
    drop(handle);

    if found.as_deref() == Some(PROBE_EXPECTED_COUNTRY) {
        log::debug!(
            "Verification successful: test IP {} correctly identified as {}",
            PROBE_IP,
            PROBE_EXPECTED_COUNTRY
        );
        Ok(ProbeOutcome::Matched)
    } else {
        log::warn!(
            "Test IP {} returned country {:?}, expected {}. Continuing with update but this might indicate an issue",
            PROBE_IP,
            found.as_deref().unwrap_or(""),
            PROBE_EXPECTED_COUNTRY
        );
        Ok(ProbeOutcome::Mismatch { found })
    }
}
