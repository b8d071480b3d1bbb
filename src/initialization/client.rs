//! HTTP client initialization.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::DOWNLOAD_TIMEOUT;

/// Initializes the HTTP client used for provider downloads.
///
/// Creates a `reqwest::Client` configured with:
/// - One overall timeout per request (a stalled download is aborted)
/// - A short connect timeout
/// - A crate User-Agent
/// - Rustls TLS backend (no native TLS)
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_download_client() -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .timeout(DOWNLOAD_TIMEOUT)
        .connect_timeout(Duration::from_secs(30))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}
