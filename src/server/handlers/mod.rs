//! HTTP handlers.

mod lookup;
mod status;

pub use lookup::{city_handler, country_handler, region_handler, usage};
pub use status::{cache_stats_handler, health_handler, root_handler};
