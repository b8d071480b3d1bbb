//! GeoIP data structures.

use std::fmt;

use serde::Serialize;

/// What an opened dataset can answer, detected once when it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatasetKind {
    /// Country codes only
    CountryOnly,
    /// Country, city and region
    CityCapable,
}

impl DatasetKind {
    /// Short label used in logs and the usage page.
    pub fn label(self) -> &'static str {
        match self {
            DatasetKind::CountryOnly => "Country",
            DatasetKind::CityCapable => "City",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A resolved location.
///
/// `city` and `region` are empty for country-only datasets and for records
/// without that detail. `region` is the ISO code of the first subdivision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeoRecord {
    pub country: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub city: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
}

impl GeoRecord {
    /// A record carrying only a country code.
    pub fn country_only(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            ..Self::default()
        }
    }
}
