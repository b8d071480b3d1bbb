//! Error type definitions.
//!
//! One enum per concern: dataset access, download, validation, install, the
//! update pipeline as a whole, startup, and per-query failures.

use std::net::IpAddr;
use std::path::PathBuf;

use log::SetLoggerError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error building the download HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] reqwest::Error),
}

/// Errors raised while opening or querying a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The dataset file could not be read.
    #[error("Failed to read dataset {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not a dataset this loader understands.
    #[error("Failed to parse dataset {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// The dataset does not support the requested lookup style.
    #[error("{0} lookups are not supported by this dataset")]
    Unsupported(&'static str),

    /// A lookup against an opened dataset failed.
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// Neither the city nor the country capability probe succeeded.
    #[error("Unable to detect dataset kind: both city and country lookups failed")]
    UnknownKind,
}

/// Errors raised while fetching a candidate dataset from the provider.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network-level failure, including the overall request timeout.
    #[error("Failed to download dataset: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Failed to download dataset: received status {status} - {body}")]
    Status { status: u16, body: String },

    /// Either the response body or the unpacked entry exceeded the cap.
    #[error("Dataset download too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    /// The archive could not be decompressed or unpacked.
    #[error("Failed to read dataset archive: {0}")]
    Archive(#[source] std::io::Error),

    /// The archive held no entry with the dataset suffix.
    #[error("Could not find a {suffix} file in the downloaded archive")]
    MissingEntry { suffix: &'static str },

    /// The staging area could not be created.
    #[error("Failed to create staging directory in {}: {source}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The extracted entry could not be written to the staging area.
    #[error("Failed to write candidate dataset {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking extraction task panicked or was cancelled.
    #[error("Dataset extraction task failed: {0}")]
    Task(String),
}

/// Errors that reject a downloaded candidate.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Structural stage: the candidate does not open as a dataset.
    #[error("Verification failed: candidate dataset is invalid: {0}")]
    Open(#[source] DatasetError),

    /// Semantic stage: the probe lookup itself errored.
    #[error("Verification failed: lookup for {ip} failed on candidate dataset: {source}")]
    Probe {
        ip: IpAddr,
        #[source]
        source: DatasetError,
    },
}

/// Errors raised while publishing a validated candidate.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The destination directory could not be created.
    #[error("Failed to create dataset directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The atomic rename into the canonical path failed.
    #[error("Failed to move verified dataset from {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The freshly installed file did not reopen.
    #[error("Installed dataset failed to open: {0}")]
    Reopen(#[source] DatasetError),
}

/// Errors from one run of the download, validate and install pipeline.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// No provider credential is configured, so nothing can be downloaded.
    #[error("MAXMIND_LICENSE_KEY not set, cannot download the GeoIP database")]
    MissingCredential,

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Install(#[from] InstallError),

    /// A blocking pipeline stage panicked or was cancelled.
    #[error("Update task failed: {0}")]
    Task(String),
}

/// Conditions that stop the service from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    /// Nothing to serve and no way to fetch it.
    #[error("No GeoIP database at {} and MAXMIND_LICENSE_KEY is not set", .0.display())]
    NoDatasetNoCredential(PathBuf),

    /// The initial download failed and no usable file exists.
    #[error("Failed to download or verify GeoIP database: {0}")]
    InitialUpdate(#[source] UpdateError),

    /// The canonical file exists but does not open.
    #[error("Failed to open GeoIP database: {0}")]
    Open(#[source] DatasetError),

    /// The blocking open task panicked or was cancelled.
    #[error("Startup task failed: {0}")]
    Task(String),
}

/// Per-query failures visible to callers.
///
/// Together with a found record and the not-found sentinel these are the only
/// outcomes a caller ever sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The input is not an IP address.
    #[error("Invalid IP address: {0}")]
    InvalidAddress(String),

    /// No usable dataset is available right now.
    #[error("Database not available")]
    Unavailable,
}
