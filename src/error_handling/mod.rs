//! Error handling.
//!
//! Errors are split by pipeline stage so callers can tell a rejected
//! download apart from a failed install, while per-query failures stay
//! limited to client input errors and service unavailability.

mod types;

// Re-export public API
pub use types::{
    DatasetError, DownloadError, InitializationError, InstallError, QueryError, StartupError,
    UpdateError, ValidationError,
};
