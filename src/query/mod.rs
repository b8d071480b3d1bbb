//! Query answering on top of the dataset manager.

mod cache;
mod service;

pub use cache::{CacheStats, QueryCache};
pub use service::{Lookup, QueryService};
