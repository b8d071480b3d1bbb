//! In-memory and JSON-file datasets for unit tests.

use std::collections::HashMap;
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::config::PROBE_IP;
use crate::error_handling::DatasetError;
use crate::geoip::dataset::{DatasetLoader, GeoDataset};
use crate::geoip::types::{DatasetKind, GeoRecord};

pub fn city_record(country: &str, city: &str, region: &str) -> GeoRecord {
    GeoRecord {
        country: country.to_string(),
        city: city.to_string(),
        region: region.to_string(),
    }
}

/// Dataset answering from a map. `kind == None` makes every lookup fail.
pub struct StaticDataset {
    kind: Option<DatasetKind>,
    records: HashMap<IpAddr, GeoRecord>,
    dropped: Option<Arc<AtomicBool>>,
    fail_unless_probe: bool,
}

impl StaticDataset {
    pub fn city() -> Self {
        Self::with_kind(Some(DatasetKind::CityCapable))
    }

    pub fn country() -> Self {
        Self::with_kind(Some(DatasetKind::CountryOnly))
    }

    pub fn broken() -> Self {
        Self::with_kind(None)
    }

    fn with_kind(kind: Option<DatasetKind>) -> Self {
        Self {
            kind,
            records: HashMap::new(),
            dropped: None,
            fail_unless_probe: false,
        }
    }

    pub fn with(mut self, ip: &str, record: GeoRecord) -> Self {
        self.records.insert(ip.parse().expect("test ip"), record);
        self
    }

    /// Passes kind detection, then fails every lookup not for the probe address.
    pub fn failing_except_probe(mut self) -> Self {
        self.fail_unless_probe = true;
        self
    }

    fn check(&self, ip: IpAddr) -> Result<(), DatasetError> {
        if self.kind.is_none() || (self.fail_unless_probe && ip != PROBE_IP) {
            return Err(DatasetError::Lookup("broken dataset".to_string()));
        }
        Ok(())
    }

    /// Sets `flag` when the dataset is dropped.
    pub fn track_drop(mut self, flag: Arc<AtomicBool>) -> Self {
        self.dropped = Some(flag);
        self
    }
}

impl Drop for StaticDataset {
    fn drop(&mut self) {
        if let Some(flag) = &self.dropped {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

impl GeoDataset for StaticDataset {
    fn country(&self, ip: IpAddr) -> Result<Option<String>, DatasetError> {
        self.check(ip)?;
        Ok(self.records.get(&ip).map(|r| r.country.clone()))
    }

    fn city(&self, ip: IpAddr) -> Result<Option<GeoRecord>, DatasetError> {
        self.check(ip)?;
        match self.kind {
            Some(DatasetKind::CityCapable) => Ok(self.records.get(&ip).cloned()),
            Some(DatasetKind::CountryOnly) => Err(DatasetError::Unsupported("City")),
            None => Err(DatasetError::Lookup("broken dataset".to_string())),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Fixture {
    city: bool,
    records: HashMap<String, (String, String, String)>,
}

/// Loader for JSON fixture files written by [`fixture_bytes`].
pub struct JsonLoader;

impl DatasetLoader for JsonLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn GeoDataset>, DatasetError> {
        let bytes = std::fs::read(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let fixture: Fixture = serde_json::from_slice(&bytes).map_err(|e| DatasetError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut dataset = if fixture.city {
            StaticDataset::city()
        } else {
            StaticDataset::country()
        };
        for (ip, (country, city, region)) in fixture.records {
            dataset = dataset.with(&ip, city_record(&country, &city, &region));
        }
        Ok(Box::new(dataset))
    }
}

/// Serialized fixture dataset.
pub fn fixture_bytes(city: bool, records: &[(&str, GeoRecord)]) -> Vec<u8> {
    let fixture = Fixture {
        city,
        records: records
            .iter()
            .map(|(ip, r)| {
                (
                    ip.to_string(),
                    (r.country.clone(), r.city.clone(), r.region.clone()),
                )
            })
            .collect(),
    };
    serde_json::to_vec(&fixture).expect("fixture serializes")
}

/// Builds a tar.gz archive with the given entries.
pub fn tar_gz(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut tar_builder = tar::Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar_builder.append(&header, *content).unwrap();
    }
    let tar_bytes = tar_builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).unwrap();
    encoder.finish().unwrap()
}
