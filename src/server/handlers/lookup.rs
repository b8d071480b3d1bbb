//! Lookup handlers: `/country/{ip}`, `/city/{ip}`, `/region/{ip}`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::super::types::{AppState, CityResponse, CountryResponse, FormatParams, RegionResponse};
use crate::config::NOT_FOUND_COUNTRY;
use crate::error_handling::QueryError;
use crate::geoip::GeoRecord;
use crate::query::Lookup;

/// Resolves `ip`, mapping not-found to the `XX` country and query errors to
/// their HTTP status.
fn resolve(state: &AppState, ip: &str) -> Result<GeoRecord, Response> {
    match state.service.locate(ip) {
        Ok(Lookup::Found(record)) => Ok(record),
        Ok(Lookup::NotFound) => Ok(GeoRecord::country_only(NOT_FOUND_COUNTRY)),
        Err(QueryError::InvalidAddress(_)) => {
            Err((StatusCode::BAD_REQUEST, "Invalid IP address\n").into_response())
        }
        Err(QueryError::Unavailable) => {
            Err((StatusCode::SERVICE_UNAVAILABLE, "Database not available\n").into_response())
        }
    }
}

/// 400 with a usage hint, for a bare endpoint prefix.
pub fn usage(endpoint: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        format!(
            "Usage: /{0}/{{ip}} or /{0}/{{ip}}?format=json\n",
            endpoint
        ),
    )
        .into_response()
}

pub async fn country_handler(
    State(state): State<AppState>,
    Path(ip): Path<String>,
    Query(params): Query<FormatParams>,
) -> Response {
    let record = match resolve(&state, &ip) {
        Ok(record) => record,
        Err(response) => return response,
    };

    if params.wants_json() {
        Json(CountryResponse {
            ip,
            country: record.country,
        })
        .into_response()
    } else {
        format!("{}\n", record.country).into_response()
    }
}

pub async fn city_handler(
    State(state): State<AppState>,
    Path(ip): Path<String>,
    Query(params): Query<FormatParams>,
) -> Response {
    let record = match resolve(&state, &ip) {
        Ok(record) => record,
        Err(response) => return response,
    };

    if params.wants_json() {
        return Json(CityResponse {
            ip,
            country: record.country,
            city: record.city,
            region: record.region,
        })
        .into_response();
    }

    // Text: Country|City|Region, with empty parts collapsed.
    let GeoRecord {
        country,
        city,
        region,
    } = record;
    let body = match (city.is_empty(), region.is_empty()) {
        (false, false) => format!("{}|{}|{}\n", country, city, region),
        (false, true) => format!("{}|{}\n", country, city),
        (true, false) => format!("{}||{}\n", country, region),
        (true, true) => format!("{}\n", country),
    };
    body.into_response()
}

pub async fn region_handler(
    State(state): State<AppState>,
    Path(ip): Path<String>,
    Query(params): Query<FormatParams>,
) -> Response {
    let record = match resolve(&state, &ip) {
        Ok(record) => record,
        Err(response) => return response,
    };

    if params.wants_json() {
        Json(RegionResponse {
            ip,
            country: record.country,
            region: record.region,
        })
        .into_response()
    } else if record.region.is_empty() {
        format!("{}\n", record.country).into_response()
    } else {
        format!("{}|{}\n", record.country, record.region).into_response()
    }
}
