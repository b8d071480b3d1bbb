//! Usage, health and cache statistics handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::super::types::AppState;

/// Usage text naming the endpoints and the served dataset kind.
pub async fn root_handler(State(state): State<AppState>) -> Response {
    let kind = state
        .service
        .dataset_kind()
        .map(|k| k.label())
        .unwrap_or("Unavailable");

    format!(
        r#"GeoIP API
Database Type: {kind}

Endpoints:
  /country/{{ip}}              - Returns country code only
  /city/{{ip}}                 - Returns country + city + region
  /region/{{ip}}               - Returns country + region
  /health                    - Health check
  /cache/stats               - Query cache statistics

Response Formats:
  Add ?format=json for JSON response (default: plain text)

Examples:
  /country/8.8.8.8           -> US
  /country/8.8.8.8?format=json -> {{"ip":"8.8.8.8","country":"US"}}

  /city/8.8.8.8              -> US|Mountain View|CA
  /city/8.8.8.8?format=json  -> {{"ip":"8.8.8.8","country":"US","city":"Mountain View","region":"CA"}}

  /region/8.8.8.8            -> US|CA
  /region/8.8.8.8?format=json -> {{"ip":"8.8.8.8","country":"US","region":"CA"}}

Note: City and region data only available with GeoLite2-City database.
"#
    )
    .into_response()
}

/// Liveness: one live lookup against the current dataset.
pub async fn health_handler(State(state): State<AppState>) -> Response {
    match state.service.health() {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("ERROR: Database lookup failed: {}", e),
        )
            .into_response(),
    }
}

pub async fn cache_stats_handler(State(state): State<AppState>) -> Response {
    Json(state.service.cache_stats()).into_response()
}
