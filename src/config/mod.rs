//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, defaults)
//! - CLI/environment option types and their resolution into [`Config`]

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{
    resolve_cache_capacity, resolve_dataset_path, resolve_update_interval, Config, DatasetConfig,
    LogFormat, LogLevel, LogSettings, Opt,
};
