//! World Air Quality Index (aqicn.org) map-bounds feed

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::StationFeed;
use crate::config::BoundingBox;
use crate::models::{AqiSource, ObservedStation, Reading, Station};
use crate::{AirWatchError, Result};

/// WAQI map-bounds API client
pub struct WaqiFeed {
    client: ClientWithMiddleware,
    base_url: String,
    token: String,
    bounds: BoundingBox,
}

/// Top-level map-bounds response
#[derive(Debug, Deserialize)]
pub struct BoundsResponse {
    pub status: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One station marker of the map-bounds response
#[derive(Debug, Deserialize)]
pub struct BoundsStation {
    pub lat: f64,
    pub lon: f64,
    pub uid: i64,
    /// Index as a string; `"-"` when the station has no current value
    pub aqi: String,
    pub station: BoundsStationInfo,
}

#[derive(Debug, Deserialize)]
pub struct BoundsStationInfo {
    pub name: String,
    pub time: Option<String>,
}

/// Parse a WAQI index string, rejecting placeholders and negative values
#[must_use]
pub fn parse_aqi(raw: &str) -> Option<i32> {
    match raw.trim().parse::<i32>() {
        Ok(value) if value >= 0 => Some(value),
        Ok(value) => {
            warn!(value, "Ignoring negative WAQI index");
            None
        }
        Err(_) => None,
    }
}

/// Parse a WAQI station time: RFC 3339, or `YYYY-MM-DD HH:MM:SS` taken as UTC
#[must_use]
pub fn parse_station_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

impl BoundsStation {
    /// Convert to a registry station; stations without a timestamp are dropped
    #[must_use]
    pub fn to_observed_station(&self) -> Option<ObservedStation> {
        let observed_at = self.station.time.as_deref().and_then(parse_station_time)?;
        let id = format!("waqi_{}", self.uid);

        Some(ObservedStation::new(
            Station {
                id: id.clone(),
                source: AqiSource::Waqi,
                latitude: self.lat,
                longitude: self.lon,
                name: self.station.name.clone(),
            },
            Reading {
                station_id: id,
                aqi: parse_aqi(&self.aqi),
                pm25: None,
                pm10: None,
                observed_at,
            },
        ))
    }
}

/// Parse a map-bounds body into registry stations
pub fn parse_bounds_response(body: BoundsResponse) -> Result<Vec<ObservedStation>> {
    if body.status != "ok" {
        return Err(AirWatchError::api(format!(
            "WAQI returned status '{}': {}",
            body.status, body.data
        )));
    }

    let stations: Vec<BoundsStation> = serde_json::from_value(body.data)
        .map_err(|e| AirWatchError::parse(format!("Failed to parse WAQI stations: {e}")))?;

    let total = stations.len();
    let observed: Vec<ObservedStation> = stations
        .iter()
        .filter_map(BoundsStation::to_observed_station)
        .collect();

    if observed.len() < total {
        debug!(
            skipped = total - observed.len(),
            "Skipped WAQI stations without an observation time"
        );
    }
    Ok(observed)
}

impl WaqiFeed {
    #[must_use]
    pub fn new(
        client: ClientWithMiddleware,
        base_url: String,
        token: String,
        bounds: BoundingBox,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            bounds,
        }
    }

    fn bounds_url(&self) -> String {
        format!(
            "{}/map/bounds?latlng={},{},{},{}&networks=all&token={}",
            self.base_url,
            self.bounds.south,
            self.bounds.west,
            self.bounds.north,
            self.bounds.east,
            urlencoding::encode(&self.token)
        )
    }
}

#[async_trait]
impl StationFeed for WaqiFeed {
    fn source(&self) -> AqiSource {
        AqiSource::Waqi
    }

    fn name(&self) -> &str {
        "waqi"
    }

    #[instrument(skip(self), name = "waqi_fetch")]
    async fn fetch(&self) -> Result<Vec<ObservedStation>> {
        let response = self.client.get(self.bounds_url()).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AirWatchError::api(format!("WAQI API error {status}")));
        }

        let body: BoundsResponse = response
            .json()
            .await
            .map_err(|e| AirWatchError::parse(format!("Failed to parse WAQI response: {e}")))?;

        let stations = parse_bounds_response(body)?;
        info!("Fetched {} stations from WAQI", stations.len());
        Ok(stations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn response(json: &str) -> BoundsResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_bounds_response() {
        let body = response(
            r#"{
                "status": "ok",
                "data": [
                    {"lat": 9.9816, "lon": 76.2999, "uid": 11276, "aqi": "87",
                     "station": {"name": "Vyttila, Kochi, India", "time": "2026-03-01T10:00:00+05:30"}},
                    {"lat": 10.0159, "lon": 76.3419, "uid": 12402, "aqi": "-",
                     "station": {"name": "Eloor, Kochi, India", "time": "2026-03-01 04:30:00"}},
                    {"lat": 8.5241, "lon": 76.9366, "uid": 8675, "aqi": "54",
                     "station": {"name": "Plammoodu, Thiruvananthapuram"}}
                ]
            }"#,
        );

        let stations = parse_bounds_response(body).unwrap();
        assert_eq!(stations.len(), 2);

        let vyttila = &stations[0];
        assert_eq!(vyttila.station.id, "waqi_11276");
        assert_eq!(vyttila.station.source, AqiSource::Waqi);
        assert_eq!(vyttila.reading.station_id, "waqi_11276");
        assert_eq!(vyttila.reading.aqi, Some(87));
        assert_eq!(
            vyttila.reading.observed_at,
            Utc.with_ymd_and_hms(2026, 3, 1, 4, 30, 0).unwrap()
        );

        let eloor = &stations[1];
        assert_eq!(eloor.reading.aqi, None);
        assert_eq!(
            eloor.reading.observed_at,
            Utc.with_ymd_and_hms(2026, 3, 1, 4, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_error_status() {
        let body = response(r#"{"status": "error", "data": "Invalid key"}"#);
        let result = parse_bounds_response(body);
        assert!(matches!(result, Err(AirWatchError::Api { .. })));
    }

    #[test]
    fn test_parse_aqi() {
        assert_eq!(parse_aqi("153"), Some(153));
        assert_eq!(parse_aqi(" 0 "), Some(0));
        assert_eq!(parse_aqi("-"), None);
        assert_eq!(parse_aqi("-12"), None);
    }

    #[test]
    fn test_parse_station_time() {
        assert!(parse_station_time("2026-03-01T10:00:00Z").is_some());
        assert!(parse_station_time("yesterday").is_none());
    }
}
