//! Candidate dataset download.
//!
//! One GET to the provider per attempt. The body is read under a hard size
//! cap, then unpacked into a staging directory that lives next to the
//! canonical file (so install is a same-filesystem rename) and is removed
//! when the [`CandidateDataset`] is dropped, whatever the outcome.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use url::form_urlencoded;

use crate::config::{CITY_EDITION, COUNTRY_EDITION, DATASET_SUFFIX, MAX_GEOIP_DOWNLOAD_SIZE};
use crate::error_handling::DownloadError;
use crate::geoip::extract::extract_dataset_entry;

/// Bytes of a non-success response body read for the error message.
const ERROR_BODY_LIMIT: usize = 1024;

/// Picks the provider edition from the canonical file name: names containing
/// "city" (any case) get the City edition.
pub fn edition_for_path(path: &Path) -> &'static str {
    let is_city = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase().contains("city"))
        .unwrap_or(false);
    if is_city {
        CITY_EDITION
    } else {
        COUNTRY_EDITION
    }
}

/// Builds the download URL. Edition and key are form-urlencoded.
pub fn download_url(base_url: &str, edition: &str, license_key: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("edition_id", edition)
        .append_pair("license_key", license_key)
        .append_pair("suffix", "tar.gz")
        .finish();
    format!("{}?{}", base_url, query)
}

/// A downloaded, not yet trusted dataset file.
///
/// The file lives inside a private staging directory that is deleted when
/// this value is dropped.
#[derive(Debug)]
pub struct CandidateDataset {
    path: PathBuf,
    staging: TempDir,
}

impl CandidateDataset {
    /// Location of the candidate file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Staging directory holding the candidate.
    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }
}

/// Fetches candidate datasets from the provider.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    base_url: String,
    license_key: String,
    max_size: u64,
}

impl Downloader {
    /// Creates a downloader for `license_key` against `base_url`.
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        license_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            license_key: license_key.into(),
            max_size: MAX_GEOIP_DOWNLOAD_SIZE,
        }
    }

    /// Overrides the size cap applied to the archive and the unpacked file.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Downloads and unpacks the edition matching `canonical`.
    ///
    /// # Errors
    ///
    /// Returns a `DownloadError` on network failure or timeout, non-success
    /// status, oversized payload, a missing dataset entry, or write failure.
    pub async fn fetch(&self, canonical: &Path) -> Result<CandidateDataset, DownloadError> {
        let edition = edition_for_path(canonical);
        log::debug!("Starting database download (edition: {})", edition);

        let staging = create_staging_dir(canonical)?;
        let archive = self.download_archive(edition).await?;

        log::debug!(
            "Download successful ({} bytes), extracting archive into {}",
            archive.len(),
            staging.path().display()
        );
        let dest_dir = staging.path().to_path_buf();
        let max_size = self.max_size;
        let path = tokio::task::spawn_blocking(move || {
            extract_dataset_entry(archive.as_slice(), &dest_dir, DATASET_SUFFIX, max_size)
        })
        .await
        .map_err(|e| DownloadError::Task(e.to_string()))??;

        Ok(CandidateDataset { path, staging })
    }

    /// Reads the archive body, enforcing the size cap on the declared and the
    /// actual length.
    async fn download_archive(&self, edition: &str) -> Result<Vec<u8>, DownloadError> {
        let url = download_url(&self.base_url, edition, &self.license_key);
        let mut response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = error_details(&mut response).await;
            return Err(DownloadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_size {
                return Err(DownloadError::TooLarge {
                    size: content_length,
                    max: self.max_size,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let size = (body.len() + chunk.len()) as u64;
            if size > self.max_size {
                return Err(DownloadError::TooLarge {
                    size,
                    max: self.max_size,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

/// Reads at most [`ERROR_BODY_LIMIT`] bytes of an error response and keeps
/// the first 200 characters. The rest of the body is never read.
async fn error_details(response: &mut reqwest::Response) -> String {
    let mut body = Vec::new();
    while body.len() < ERROR_BODY_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(_) if body.is_empty() => return "No error details".to_string(),
            Err(_) => break,
        }
    }
    body.truncate(ERROR_BODY_LIMIT);
    String::from_utf8_lossy(&body).chars().take(200).collect()
}

/// Creates a process-unique staging directory beside `canonical`, creating
/// the parent directory if needed.
fn create_staging_dir(canonical: &Path) -> Result<TempDir, DownloadError> {
    let parent = canonical
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let staging_error = |source| DownloadError::Staging {
        path: parent.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(parent).map_err(staging_error)?;
    tempfile::Builder::new()
        .prefix(".geoipdb-")
        .tempdir_in(parent)
        .map_err(staging_error)
}
