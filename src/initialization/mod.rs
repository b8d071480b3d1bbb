//! Application initialization.
//!
//! Shared resources set up once at process start: the logger and the HTTP
//! client used for provider downloads.

mod client;
mod logger;

// Re-export public API
pub use client::init_download_client;
pub use logger::init_logger_with;
