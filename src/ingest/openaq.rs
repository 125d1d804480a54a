//! OpenAQ v3 feed: locations in a bounding box plus their latest values

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

use super::StationFeed;
use crate::config::BoundingBox;
use crate::models::{AqiSource, ObservedStation, Reading, Station};
use crate::{AirWatchError, Result};

/// OpenAQ parameter id of PM2.5
const PM25_PARAMETER_ID: u32 = 2;
/// Concurrent `/latest` requests per refresh
const LATEST_CONCURRENCY: usize = 4;
/// Values outside (0, 500) µg/m³ are sensor faults
const MAX_PLAUSIBLE_VALUE: f64 = 500.0;

/// OpenAQ v3 API client
pub struct OpenAqFeed {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    bounds: BoundingBox,
    max_locations: u32,
}

#[derive(Debug, Deserialize)]
pub struct ResultsEnvelope<T> {
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAqLocation {
    pub id: i64,
    pub name: Option<String>,
    pub coordinates: Option<OpenAqCoordinates>,
    #[serde(default)]
    pub sensors: Vec<OpenAqSensor>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAqCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct OpenAqSensor {
    pub id: i64,
    pub parameter: OpenAqParameter,
}

#[derive(Debug, Deserialize)]
pub struct OpenAqParameter {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenAqLatest {
    pub value: Option<f64>,
    #[serde(rename = "sensorsId")]
    pub sensors_id: i64,
    pub datetime: OpenAqDatetime,
}

#[derive(Debug, Deserialize)]
pub struct OpenAqDatetime {
    pub utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Pollutant {
    Pm25,
    Pm10,
}

impl OpenAqLocation {
    fn pollutant_by_sensor(&self) -> HashMap<i64, Pollutant> {
        self.sensors
            .iter()
            .filter_map(|sensor| {
                let pollutant = match sensor.parameter.name.as_str() {
                    "pm25" => Pollutant::Pm25,
                    "pm10" => Pollutant::Pm10,
                    _ => return None,
                };
                Some((sensor.id, pollutant))
            })
            .collect()
    }

    /// Fold the latest sensor values into one reading.
    ///
    /// Implausible values are discarded, the newest value per pollutant
    /// wins, and the reading time is the newest accepted measurement.
    /// Returns `None` when the location has no coordinates or no usable PM
    /// value.
    pub fn to_observed_station(&self, latest: &[OpenAqLatest]) -> Option<ObservedStation> {
        let coordinates = self.coordinates.as_ref()?;
        let sensors = self.pollutant_by_sensor();

        let mut newest: HashMap<Pollutant, (f64, DateTime<Utc>)> = HashMap::new();
        for measurement in latest {
            let Some(value) = measurement.value else {
                continue;
            };
            if value <= 0.0 || value >= MAX_PLAUSIBLE_VALUE {
                continue;
            }
            let Some(&pollutant) = sensors.get(&measurement.sensors_id) else {
                continue;
            };

            let at = measurement.datetime.utc;
            match newest.get(&pollutant) {
                Some(&(_, existing)) if existing >= at => {}
                _ => {
                    newest.insert(pollutant, (value, at));
                }
            }
        }

        let observed_at = newest.values().map(|&(_, at)| at).max()?;
        let id = format!("openaq_{}", self.id);
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| "OpenAQ Station".to_string());

        Some(ObservedStation::new(
            Station {
                id: id.clone(),
                source: AqiSource::OpenAq,
                latitude: coordinates.latitude,
                longitude: coordinates.longitude,
                name,
            },
            Reading {
                station_id: id,
                aqi: None,
                pm25: newest.get(&Pollutant::Pm25).map(|&(value, _)| value),
                pm10: newest.get(&Pollutant::Pm10).map(|&(value, _)| value),
                observed_at,
            },
        ))
    }
}

impl OpenAqFeed {
    #[must_use]
    pub fn new(
        client: ClientWithMiddleware,
        base_url: String,
        api_key: String,
        bounds: BoundingBox,
        max_locations: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            bounds,
            max_locations,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(match status.as_u16() {
                401 | 403 => AirWatchError::api("OpenAQ rejected the API key"),
                429 => AirWatchError::api("OpenAQ rate limit exceeded"),
                _ => AirWatchError::api(format!("OpenAQ API error {status}")),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AirWatchError::parse(format!("Failed to parse OpenAQ response: {e}")))
    }

    async fn locations(&self) -> Result<Vec<OpenAqLocation>> {
        let url = format!(
            "{}/locations?bbox={},{},{},{}&parameters_id={}&limit={}",
            self.base_url,
            self.bounds.west,
            self.bounds.south,
            self.bounds.east,
            self.bounds.north,
            PM25_PARAMETER_ID,
            self.max_locations
        );
        let envelope: ResultsEnvelope<OpenAqLocation> = self.get_json(&url).await?;
        Ok(envelope.results)
    }

    async fn latest(&self, location_id: i64) -> Result<Vec<OpenAqLatest>> {
        let url = format!("{}/locations/{}/latest", self.base_url, location_id);
        let envelope: ResultsEnvelope<OpenAqLatest> = self.get_json(&url).await?;
        Ok(envelope.results)
    }
}

#[async_trait]
impl StationFeed for OpenAqFeed {
    fn source(&self) -> AqiSource {
        AqiSource::OpenAq
    }

    fn name(&self) -> &str {
        "openaq"
    }

    #[instrument(skip(self), name = "openaq_fetch")]
    async fn fetch(&self) -> Result<Vec<ObservedStation>> {
        let locations = self.locations().await?;
        let queried = locations.len();
        debug!("OpenAQ returned {} locations", queried);

        let stations: Vec<ObservedStation> = stream::iter(locations.into_iter())
            .map(|location| async move {
                match self.latest(location.id).await {
                    Ok(latest) => location.to_observed_station(&latest),
                    Err(e) => {
                        warn!(location = location.id, "Skipping OpenAQ location: {}", e);
                        None
                    }
                }
            })
            .buffer_unordered(LATEST_CONCURRENCY)
            .filter_map(|station| async move { station })
            .collect()
            .await;

        info!(
            "Fetched {} stations from OpenAQ ({} locations queried)",
            stations.len(),
            queried
        );
        Ok(stations)
    }
}
