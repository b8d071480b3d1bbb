//! HTTP server data structures.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::query::QueryService;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueryService>,
}

/// `?format=` query parameter. Only `json` changes the output.
#[derive(Debug, Default, Deserialize)]
pub struct FormatParams {
    pub format: Option<String>,
}

impl FormatParams {
    pub fn wants_json(&self) -> bool {
        self.format.as_deref() == Some("json")
    }
}

/// JSON response for `/country/{ip}`
#[derive(Serialize)]
pub struct CountryResponse {
    pub ip: String,
    pub country: String,
}

/// JSON response for `/city/{ip}`
#[derive(Serialize)]
pub struct CityResponse {
    pub ip: String,
    pub country: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub city: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
}

/// JSON response for `/region/{ip}`
#[derive(Serialize)]
pub struct RegionResponse {
    pub ip: String,
    pub country: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
}
