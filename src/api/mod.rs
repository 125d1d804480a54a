//! HTTP routes of the AQI service

use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::aqi::AqiService;
use crate::cache::ResponseCache;
use crate::models::{AggregateResult, AqiSource, Coordinates, MapPoint};

pub mod error;

pub use error::{ApiError, AppError};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: AqiService,
    pub cache: Option<ResponseCache>,
}

impl AppState {
    #[must_use]
    pub fn new(service: AqiService, cache: Option<ResponseCache>) -> Self {
        Self { service, cache }
    }
}

/// Raw query of `/aqi/current`; values are parsed by the handler so that
/// missing and non-numeric input share one error shape
#[derive(Debug, Deserialize)]
pub struct CurrentQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub waqi_stations: usize,
    pub openaq_stations: usize,
    pub refreshed_at: Option<DateTime<Utc>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/aqi/current", get(current_aqi))
        .route("/aqi/all", get(all_aqi))
        .route("/health", get(health))
        .with_state(state)
}

fn parse_param(name: &str, raw: Option<&str>) -> Result<f64, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing query parameter '{name}'")))?;
    raw.parse::<f64>()
        .map_err(|_| AppError::BadRequest(format!("Query parameter '{name}' must be a number")))
}

impl CurrentQuery {
    fn coordinates(&self) -> Result<Coordinates, AppError> {
        let lat = parse_param("lat", self.lat.as_deref())?;
        let lng = parse_param("lng", self.lng.as_deref())?;
        Ok(Coordinates::new(lat, lng)?)
    }
}

#[instrument(skip(state))]
async fn current_aqi(
    State(state): State<AppState>,
    Query(query): Query<CurrentQuery>,
) -> Result<Json<AggregateResult>, AppError> {
    let coordinates = query.coordinates()?;
    let key = coordinates.cache_key();

    if let Some(cache) = &state.cache {
        match cache.get::<AggregateResult>(&key).await {
            Ok(Some(cached)) => {
                debug!(key, "Serving cached AQI");
                return Ok(Json(cached));
            }
            Ok(None) => {}
            Err(e) => warn!(key, "Cache lookup failed: {}", e),
        }
    }

    let result = state.service.current(&coordinates, Utc::now())?;

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.put(&key, result.clone()).await {
            warn!(key, "Failed to cache AQI: {}", e);
        }
    }

    Ok(Json(result))
}

async fn all_aqi(State(state): State<AppState>) -> Json<Vec<MapPoint>> {
    Json(state.service.all(Utc::now()))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.service.registry().snapshot();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        waqi_stations: snapshot.stations(AqiSource::Waqi).len(),
        openaq_stations: snapshot.stations(AqiSource::OpenAq).len(),
        refreshed_at: snapshot.refreshed_at(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn query(lat: Option<&str>, lng: Option<&str>) -> CurrentQuery {
        CurrentQuery {
            lat: lat.map(String::from),
            lng: lng.map(String::from),
        }
    }

    #[test]
    fn test_valid_query() {
        let coordinates = query(Some("9.93"), Some(" 76.27 ")).coordinates().unwrap();
        assert_eq!(coordinates.latitude, 9.93);
        assert_eq!(coordinates.longitude, 76.27);
    }

    #[rstest]
    #[case(None, Some("76.27"))]
    #[case(Some("9.93"), None)]
    #[case(Some(""), Some("76.27"))]
    #[case(Some("north"), Some("76.27"))]
    fn test_bad_request(#[case] lat: Option<&str>, #[case] lng: Option<&str>) {
        assert!(matches!(
            query(lat, lng).coordinates(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[rstest]
    #[case("91", "0")]
    #[case("0", "-180.5")]
    #[case("NaN", "0")]
    fn test_invalid_coordinate(#[case] lat: &str, #[case] lng: &str) {
        assert!(matches!(
            query(Some(lat), Some(lng)).coordinates(),
            Err(AppError::Service(crate::AirWatchError::InvalidCoordinate { .. }))
        ));
    }
}
