//! AQI result shapes returned by the aggregation pipeline
//!
//! These types double as the JSON wire format of `/aqi/current` and
//! `/aqi/all`, so field names follow the frontend contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::AqiSource;

/// Severity band of the Indian National AQI
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AqiCategory {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    #[serde(rename = "Very Poor")]
    VeryPoor,
    Severe,
    /// No source reported an index
    Unavailable,
}

impl AqiCategory {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Satisfactory => "Satisfactory",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::Poor => "Poor",
            AqiCategory::VeryPoor => "Very Poor",
            AqiCategory::Severe => "Severe",
            AqiCategory::Unavailable => "Unavailable",
        }
    }

    /// Fixed health advice shown next to the category
    #[must_use]
    pub fn health_message(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Air quality is good. Enjoy outdoor activities.",
            AqiCategory::Satisfactory => "Minor breathing discomfort to sensitive people.",
            AqiCategory::Moderate => "Breathing discomfort to people with lung disease.",
            AqiCategory::Poor => "Breathing discomfort to most people on prolonged exposure.",
            AqiCategory::VeryPoor => "Respiratory illness on prolonged exposure.",
            AqiCategory::Severe => "Serious health impacts. Avoid outdoor activities.",
            AqiCategory::Unavailable => "No AQI data available for your area.",
        }
    }

    /// Display colour used by map markers
    #[must_use]
    pub fn color(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Green",
            AqiCategory::Satisfactory => "Light Green",
            AqiCategory::Moderate => "Yellow",
            AqiCategory::Poor => "Orange",
            AqiCategory::VeryPoor => "Red",
            AqiCategory::Severe => "Dark Red",
            AqiCategory::Unavailable => "Grey",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Nearest station of one source, normalized and classified for a query point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedSourceResult {
    pub source: AqiSource,
    pub station_id: String,
    pub station_name: String,
    pub station_distance_km: f64,
    /// Effective index: CPCB value when particulates are known, else upstream
    pub aqi: Option<i32>,
    pub aqi_raw: Option<i32>,
    pub aqi_cpcb: Option<i32>,
    pub category: AqiCategory,
    pub health_message: String,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub timestamp_utc: DateTime<Utc>,
    pub age_hours: f64,
    pub is_stale: bool,
}

/// Reconciled answer for `/aqi/current`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateResult {
    pub aqi: Option<i32>,
    pub category: AqiCategory,
    pub health_message: String,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    /// Provenance label, e.g. `WAQI - Kochi (+ OpenAQ)`
    pub source: String,
    pub station_name: Option<String>,
    pub primary_source: Option<AqiSource>,
    pub waqi: Option<ResolvedSourceResult>,
    pub openaq: Option<ResolvedSourceResult>,
}

/// One marker of the `/aqi/all` map layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub aqi: i32,
    pub category: AqiCategory,
    pub health_message: String,
    /// Marker colour of the category
    pub color: String,
    pub location_name: String,
    pub source: AqiSource,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}
