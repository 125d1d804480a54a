//! End-to-end AQI lookups over a registry snapshot

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::aggregator::{aggregate, resolve_source};
use super::classifier::classify;
use super::normalizer::normalize;
use super::resolver::resolve;
use crate::Result;
use crate::config::AqiConfig;
use crate::models::{AggregateResult, AqiSource, Coordinates, MapPoint, ResolvedSourceResult};
use crate::registry::{RegistrySnapshot, StationRegistry};

/// Tunables of the aggregation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AqiSettings {
    pub waqi_max_radius_km: f64,
    pub openaq_max_radius_km: f64,
    pub stale_threshold_hours: f64,
    pub map_max_age_hours: f64,
}

impl AqiSettings {
    #[must_use]
    pub fn max_radius_km(&self, source: AqiSource) -> f64 {
        match source {
            AqiSource::Waqi => self.waqi_max_radius_km,
            AqiSource::OpenAq => self.openaq_max_radius_km,
        }
    }
}

impl From<&AqiConfig> for AqiSettings {
    fn from(config: &AqiConfig) -> Self {
        Self {
            waqi_max_radius_km: config.waqi_max_radius_km,
            openaq_max_radius_km: config.openaq_max_radius_km,
            stale_threshold_hours: config.stale_threshold_hours,
            map_max_age_hours: config.map_max_age_hours,
        }
    }
}

impl Default for AqiSettings {
    fn default() -> Self {
        Self::from(&AqiConfig::default())
    }
}

/// Oldest observation time still shown on the map. Windows too large to
/// represent include every reading.
fn map_cutoff(now: DateTime<Utc>, window_hours: f64) -> DateTime<Utc> {
    let window_ms = window_hours * 3_600_000.0;
    if !window_ms.is_finite() || window_ms >= i64::MAX as f64 {
        return DateTime::<Utc>::MIN_UTC;
    }
    TimeDelta::try_milliseconds(window_ms as i64)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Resolver → normalizer → aggregator pipeline bound to a registry
#[derive(Debug, Clone)]
pub struct AqiService {
    registry: Arc<StationRegistry>,
    settings: AqiSettings,
}

impl AqiService {
    #[must_use]
    pub fn new(registry: Arc<StationRegistry>, settings: AqiSettings) -> Self {
        Self { registry, settings }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<StationRegistry> {
        &self.registry
    }

    fn resolve_for_source(
        &self,
        snapshot: &RegistrySnapshot,
        source: AqiSource,
        query: &Coordinates,
        now: DateTime<Utc>,
    ) -> Result<Option<ResolvedSourceResult>> {
        let candidates = snapshot.stations(source);
        let Some(nearest) = resolve(candidates, query, self.settings.max_radius_km(source)) else {
            debug!(%source, candidates = candidates.len(), "No station within range");
            return Ok(None);
        };

        let observed = nearest.candidate;
        let normalized = normalize(
            &observed.reading,
            now,
            self.settings.stale_threshold_hours,
        );
        resolve_source(
            &observed.station,
            nearest.distance_km,
            observed.reading.observed_at,
            normalized,
        )
        .map(Some)
    }

    /// Reconciled AQI for a query point at instant `now`
    #[instrument(skip(self), fields(lat = query.latitude, lng = query.longitude))]
    pub fn current(&self, query: &Coordinates, now: DateTime<Utc>) -> Result<AggregateResult> {
        let snapshot = self.registry.snapshot();

        let waqi = self.resolve_for_source(&snapshot, AqiSource::Waqi, query, now)?;
        let openaq = self.resolve_for_source(&snapshot, AqiSource::OpenAq, query, now)?;

        let result = aggregate(waqi, openaq)?;
        debug!(aqi = ?result.aqi, source = %result.source, "Aggregated AQI");
        Ok(result)
    }

    /// Map markers: the latest reading per location observed within the
    /// configured window. Stations with malformed readings are skipped and
    /// logged so one bad upstream value does not blank the map.
    #[instrument(skip(self))]
    pub fn all(&self, now: DateTime<Utc>) -> Vec<MapPoint> {
        let snapshot = self.registry.snapshot();
        let cutoff = map_cutoff(now, self.settings.map_max_age_hours);
        let mut latest: HashMap<&str, MapPoint> = HashMap::new();

        for observed in snapshot.all_stations() {
            if observed.reading.observed_at < cutoff {
                continue;
            }

            let normalized = normalize(
                &observed.reading,
                now,
                self.settings.stale_threshold_hours,
            );
            let Some(aqi) = normalized.aqi else {
                continue;
            };
            let classification = match classify(aqi) {
                Ok(classification) => classification,
                Err(e) => {
                    error!(station = %observed.station.id, "Skipping map point: {}", e);
                    continue;
                }
            };

            let point = MapPoint {
                latitude: observed.station.latitude,
                longitude: observed.station.longitude,
                aqi,
                category: classification.category,
                health_message: classification.health_message,
                color: classification.category.color().to_string(),
                location_name: observed.station.name.clone(),
                source: observed.station.source,
                pm25: normalized.pm25,
                pm10: normalized.pm10,
                recorded_at: observed.reading.observed_at,
            };

            match latest.get(observed.station.name.as_str()) {
                Some(existing) if existing.recorded_at >= point.recorded_at => {
                    debug!(location = %observed.station.name, "Keeping newer reading for location");
                }
                _ => {
                    latest.insert(observed.station.name.as_str(), point);
                }
            }
        }

        let mut points: Vec<MapPoint> = latest.into_values().collect();
        points.sort_by(|a, b| {
            b.recorded_at
                .cmp(&a.recorded_at)
                .then_with(|| a.location_name.cmp(&b.location_name))
        });
        points
    }
}
