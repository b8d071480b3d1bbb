//! GeoIP dataset lifecycle.
//!
//! Opening datasets and detecting what they can answer, owning the handle
//! currently being served, deciding when it is stale, and replacing it with a
//! freshly downloaded and validated copy from MaxMind.

mod bootstrap;
mod dataset;
mod download;
mod extract;
mod freshness;
mod install;
mod manager;
mod pipeline;
mod types;
mod updater;
mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use bootstrap::load_initial_dataset;
pub use dataset::{detect_kind, DatasetHandle, DatasetLoader, GeoDataset, MaxMindLoader};
pub use download::{download_url, edition_for_path, CandidateDataset, Downloader};
pub use freshness::{check_freshness, needs_update, Freshness};
pub use install::{install_candidate, open_installed};
pub use manager::DatasetManager;
pub use pipeline::{DatasetProvisioner, Provisioned};
pub use types::{DatasetKind, GeoRecord};
pub use updater::{spawn_updater, UpdateOutcome, Updater};
pub use validate::{validate_candidate, ProbeOutcome};
