//! Dataset loading and the query-capable handle.
//!
//! The binary format is hidden behind [`DatasetLoader`] and [`GeoDataset`];
//! the production implementation reads MaxMind `.mmdb` files. A
//! [`DatasetHandle`] wraps one opened dataset together with the kind detected
//! for it at open time, so lookups never re-probe capabilities.

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use maxminddb::{geoip2, Reader};

use crate::config::PROBE_IP;
use crate::error_handling::DatasetError;
use crate::geoip::types::{DatasetKind, GeoRecord};

/// Lookups an opened dataset supports.
///
/// Both methods return `Ok(None)` when the dataset has no record for the
/// address. `city` returns [`DatasetError::Unsupported`] on datasets that only
/// carry country data.
pub trait GeoDataset: Send + Sync {
    /// Country ISO code for `ip`.
    fn country(&self, ip: IpAddr) -> Result<Option<String>, DatasetError>;

    /// Country, city and region for `ip`.
    fn city(&self, ip: IpAddr) -> Result<Option<GeoRecord>, DatasetError>;
}

/// Opens dataset files.
pub trait DatasetLoader: Send + Sync {
    /// Opens the dataset at `path`.
    fn open(&self, path: &Path) -> Result<Box<dyn GeoDataset>, DatasetError>;
}

/// Loads MaxMind GeoLite2/GeoIP2 `.mmdb` files fully into memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxMindLoader;

impl DatasetLoader for MaxMindLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn GeoDataset>, DatasetError> {
        log::debug!("Loading GeoIP database from: {}", path.display());

        let db_bytes = std::fs::read(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = Reader::from_source(db_bytes).map_err(|e| DatasetError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // Country editions decode as City records with every city field empty,
        // so the edition name decides whether city lookups are offered.
        let city_capable = reader.metadata.database_type.contains("City");
        log::debug!(
            "Opened {} (database_type={}, build_epoch={})",
            path.display(),
            reader.metadata.database_type,
            reader.metadata.build_epoch
        );

        Ok(Box::new(MaxMindDataset {
            reader,
            city_capable,
        }))
    }
}

struct MaxMindDataset {
    reader: Reader<Vec<u8>>,
    city_capable: bool,
}

fn lookup_error(e: maxminddb::MaxMindDbError) -> DatasetError {
    DatasetError::Lookup(e.to_string())
}

impl GeoDataset for MaxMindDataset {
    fn country(&self, ip: IpAddr) -> Result<Option<String>, DatasetError> {
        let lookup = self.reader.lookup(ip).map_err(lookup_error)?;
        if !lookup.has_data() {
            return Ok(None);
        }
        let record = lookup
            .decode::<geoip2::Country>()
            .map_err(lookup_error)?;
        Ok(record.and_then(|r| r.country.iso_code.map(str::to_string)))
    }

    fn city(&self, ip: IpAddr) -> Result<Option<GeoRecord>, DatasetError> {
        if !self.city_capable {
            return Err(DatasetError::Unsupported("City"));
        }
        let lookup = self.reader.lookup(ip).map_err(lookup_error)?;
        if !lookup.has_data() {
            return Ok(None);
        }
        let Some(city) = lookup.decode::<geoip2::City>().map_err(lookup_error)? else {
            return Ok(None);
        };

        Ok(Some(GeoRecord {
            country: city.country.iso_code.unwrap_or_default().to_string(),
            city: city.city.names.english.unwrap_or_default().to_string(),
            region: city
                .subdivisions
                .first()
                .and_then(|s| s.iso_code)
                .unwrap_or_default()
                .to_string(),
        }))
    }
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// One opened dataset plus its detected kind.
pub struct DatasetHandle {
    dataset: Box<dyn GeoDataset>,
    kind: DatasetKind,
    source: PathBuf,
    generation: u64,
}

impl DatasetHandle {
    /// Opens `path` with `loader` and detects its kind.
    pub fn open(loader: &dyn DatasetLoader, path: &Path) -> Result<Self, DatasetError> {
        let dataset = loader.open(path)?;
        Self::from_dataset(dataset, path)
    }

    /// Wraps an already opened dataset, running the capability probe once.
    pub fn from_dataset(
        dataset: Box<dyn GeoDataset>,
        source: impl Into<PathBuf>,
    ) -> Result<Self, DatasetError> {
        let kind = detect_kind(dataset.as_ref())?;
        Ok(Self {
            dataset,
            kind,
            source: source.into(),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Kind detected at open time.
    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Path the dataset was opened from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Process-unique id; a reopened file gets a new one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves `ip` using the lookup style matching the dataset kind.
    ///
    /// A record without a country code counts as not found.
    pub fn locate(&self, ip: IpAddr) -> Result<Option<GeoRecord>, DatasetError> {
        let record = match self.kind {
            DatasetKind::CityCapable => self.dataset.city(ip)?,
            DatasetKind::CountryOnly => self.dataset.country(ip)?.map(GeoRecord::country_only),
        };
        Ok(record.filter(|r| !r.country.is_empty()))
    }

    /// Country-level lookup, supported by every kind.
    pub fn country(&self, ip: IpAddr) -> Result<Option<String>, DatasetError> {
        self.dataset.country(ip)
    }
}

impl fmt::Debug for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetHandle")
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Classifies a dataset: a successful city probe means city-capable, else a
/// successful country probe means country-only.
pub fn detect_kind(dataset: &dyn GeoDataset) -> Result<DatasetKind, DatasetError> {
    match dataset.city(PROBE_IP) {
        Ok(_) => return Ok(DatasetKind::CityCapable),
        Err(e) => log::debug!("City probe for {} failed: {}", PROBE_IP, e),
    }
    match dataset.country(PROBE_IP) {
        Ok(_) => Ok(DatasetKind::CountryOnly),
        Err(e) => {
            log::debug!("Country probe for {} failed: {}", PROBE_IP, e);
            Err(DatasetError::UnknownKind)
        }
    }
}
