//! geoip_api library: GeoIP lookups over a self-updating MaxMind dataset
//!
//! The service keeps one MaxMind GeoLite2 database open and answers country,
//! city and region lookups from it. A background updater checks the file's
//! age, downloads a fresh copy when it is stale, validates it, moves it into
//! place with an atomic rename and swaps the served handle without blocking
//! in-flight queries.
//!
//! # Example
//!
//! ```no_run
//! use geoip_api::{run_server, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let mut config = Config::default();
//! config.dataset.path = "/data/GeoLite2-City.mmdb".into();
//! config.dataset.license_key = Some("your-license-key".to_string());
//! config.cache_enabled = true;
//!
//! run_server(config).await
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

pub mod app;
pub mod config;
pub mod error_handling;
pub mod geoip;
pub mod initialization;
pub mod query;
mod run;
pub mod server;

// Re-export public API
pub use config::{Config, DatasetConfig, LogFormat, LogLevel, LogSettings};
pub use geoip::{DatasetKind, DatasetManager, GeoRecord, MaxMindLoader};
pub use query::{Lookup, QueryService};
pub use run::{
    build_provisioner, init_server_resources, run_server, run_server_with, ServerResources,
};
