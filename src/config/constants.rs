//! Configuration constants.
//!
//! Timeouts, size limits and defaults used throughout the service.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

// Dataset location defaults
/// Directory used when neither an explicit path nor a directory is configured
pub const DEFAULT_DB_DIR: &str = "/data";
/// File name used when no file name is configured
pub const DEFAULT_DB_FILENAME: &str = "GeoLite2-Country.mmdb";
/// Suffix of the dataset file inside the provider's archive
pub const DATASET_SUFFIX: &str = ".mmdb";

// Update schedule
/// Default update interval: 30 days
pub const DEFAULT_UPDATE_INTERVAL_HOURS: u64 = 720;

// Provider download
/// MaxMind download endpoint (edition and license key go in the query string)
pub const MAXMIND_DOWNLOAD_BASE: &str = "https://download.maxmind.com/app/geoip_download";
/// Edition downloaded for country-only datasets
pub const COUNTRY_EDITION: &str = "GeoLite2-Country";
/// Edition downloaded when the configured file name mentions "city"
pub const CITY_EDITION: &str = "GeoLite2-City";
/// Maximum size of a downloaded archive, and of the file unpacked from it (100MB)
pub const MAX_GEOIP_DOWNLOAD_SIZE: u64 = 100 * 1024 * 1024;
/// Overall timeout for one download attempt
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

// Validation probe
/// Well-known address used for capability and validation probes (Google Public DNS)
pub const PROBE_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));
/// Country the probe address is expected to resolve to
pub const PROBE_EXPECTED_COUNTRY: &str = "US";

// Query cache
/// Default number of cached answers
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

// HTTP server
/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;
/// Per-request timeout; bounds slow clients independent of dataset size
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Keep-alive connections with no request in flight are closed after this long
pub const CONNECTION_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
/// Upper bound on draining in-flight requests at shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
/// Country code rendered for addresses the dataset cannot resolve
pub const NOT_FOUND_COUNTRY: &str = "XX";
