// Shared test helpers: a JSON-backed dataset loader and provider archives.
//
// Integration tests cannot ship real MaxMind files, so datasets are small
// JSON documents opened through the public `DatasetLoader` seam.

use std::io::Write;
use std::net::IpAddr;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use geoip_api::error_handling::DatasetError;
use geoip_api::geoip::{DatasetLoader, GeoDataset};
use geoip_api::GeoRecord;

/// Dataset file contents: `(ip, country, city, region)` rows.
#[derive(Serialize, Deserialize)]
struct Fixture {
    city: bool,
    rows: Vec<(IpAddr, String, String, String)>,
}

impl Fixture {
    fn find(&self, ip: IpAddr) -> Option<GeoRecord> {
        self.rows
            .iter()
            .find(|row| row.0 == ip)
            .map(|(_, country, city, region)| GeoRecord {
                country: country.clone(),
                city: city.clone(),
                region: region.clone(),
            })
    }
}

impl GeoDataset for Fixture {
    fn country(&self, ip: IpAddr) -> Result<Option<String>, DatasetError> {
        Ok(self.find(ip).map(|record| record.country))
    }

    fn city(&self, ip: IpAddr) -> Result<Option<GeoRecord>, DatasetError> {
        if !self.city {
            return Err(DatasetError::Unsupported("City"));
        }
        Ok(self.find(ip))
    }
}

/// Opens files written by [`dataset_bytes`].
pub struct FixtureLoader;

impl DatasetLoader for FixtureLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn GeoDataset>, DatasetError> {
        let bytes = std::fs::read(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let fixture: Fixture = serde_json::from_slice(&bytes).map_err(|e| DatasetError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(fixture))
    }
}

/// Serialized dataset with one `(ip, country, city, region)` row per entry.
pub fn dataset_bytes(city: bool, rows: &[(&str, &str, &str, &str)]) -> Vec<u8> {
    let rows = rows
        .iter()
        .map(|(ip, country, city, region)| {
            (
                ip.parse().expect("fixture ip"),
                country.to_string(),
                city.to_string(),
                region.to_string(),
            )
        })
        .collect();
    serde_json::to_vec(&Fixture { city, rows }).expect("fixture serializes")
}

/// Archive laid out like the provider's: the entries sit in a dated
/// directory next to a license file.
#[allow(dead_code)] // Used by other test files
pub fn provider_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let license = [("LICENSE.txt", b"license".as_slice())];
    let mut tar_builder = tar::Builder::new(Vec::new());
    for (name, content) in license.iter().chain(entries) {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        tar_builder
            .append_data(&mut header, format!("GeoLite2_20240101/{}", name), *content)
            .unwrap();
    }
    let tar_bytes = tar_builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).unwrap();
    encoder.finish().unwrap()
}

/// Sets the file's modification time `hours` into the past.
#[allow(dead_code)] // Used by other test files
pub fn age_file(path: &Path, hours: u64) {
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(std::time::SystemTime::now() - std::time::Duration::from_secs(hours * 3600))
        .unwrap();
}
