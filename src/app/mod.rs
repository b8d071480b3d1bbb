//! Process lifecycle helpers used by the server runner.

pub mod shutdown;

pub use shutdown::{shutdown_gracefully, wait_for_shutdown_signal};
