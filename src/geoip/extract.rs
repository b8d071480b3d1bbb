//! Archive extraction.
//!
//! Unpacks the dataset file from the provider's tar.gz archive into a
//! staging directory, entry by entry.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error_handling::DownloadError;

/// Extracts the first entry whose name ends with `suffix` into `dest_dir`.
///
/// Only the entry's file name is used, so archive paths cannot escape
/// `dest_dir`. Every other entry is skipped. The unpacked file is capped at
/// `max_size` bytes to bound decompression amplification.
///
/// # Errors
///
/// - `DownloadError::Archive` if the data is not a readable tar.gz
/// - `DownloadError::MissingEntry` if no entry carries the suffix
/// - `DownloadError::TooLarge` if the entry exceeds `max_size`
/// - `DownloadError::Write` if the file cannot be written
pub(crate) fn extract_dataset_entry<R: Read>(
    archive: R,
    dest_dir: &Path,
    suffix: &'static str,
    max_size: u64,
) -> Result<PathBuf, DownloadError> {
    log::debug!("Extracting {} file from tar.gz archive", suffix);

    let mut tar_archive = Archive::new(GzDecoder::new(archive));
    let entries = tar_archive.entries().map_err(DownloadError::Archive)?;

    for entry_result in entries {
        let entry = entry_result.map_err(DownloadError::Archive)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let file_name = {
            let path = entry.path().map_err(DownloadError::Archive)?;
            match path.file_name() {
                Some(name) if name.to_string_lossy().ends_with(suffix) => name.to_os_string(),
                _ => continue,
            }
        };

        let target = dest_dir.join(&file_name);
        let write_error = |source: io::Error| DownloadError::Write {
            path: target.clone(),
            source,
        };
        let mut out = File::create(&target).map_err(write_error)?;
        let mut limited = entry.take(max_size.saturating_add(1));
        let written = io::copy(&mut limited, &mut out).map_err(write_error)?;
        if written > max_size {
            return Err(DownloadError::TooLarge {
                size: written,
                max: max_size,
            });
        }
        out.sync_all().map_err(write_error)?;

        log::info!(
            "Extracted {} from tar.gz ({} bytes)",
            file_name.to_string_lossy(),
            written
        );
        return Ok(target);
    }

    Err(DownloadError::MissingEntry { suffix })
}
