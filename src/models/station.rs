//! Monitoring stations and their latest readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Coordinates;

/// Upstream air quality data source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AqiSource {
    #[serde(rename = "WAQI")]
    Waqi,
    #[serde(rename = "OPENAQ")]
    OpenAq,
}

impl AqiSource {
    pub const ALL: [AqiSource; 2] = [AqiSource::Waqi, AqiSource::OpenAq];

    /// Human readable provider name used in source labels
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            AqiSource::Waqi => "WAQI",
            AqiSource::OpenAq => "OpenAQ",
        }
    }
}

impl fmt::Display for AqiSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A monitoring station known to one data source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Station {
    pub id: String,
    pub source: AqiSource,
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

impl Station {
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Whether the station position is usable for distance calculations
    #[must_use]
    pub fn has_valid_position(&self) -> bool {
        Coordinates::new(self.latitude, self.longitude).is_ok()
    }
}

/// Latest observation reported by a station
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    pub station_id: String,
    /// Index as reported upstream, if the source publishes one
    pub aqi: Option<i32>,
    /// PM2.5 concentration in µg/m³
    pub pm25: Option<f64>,
    /// PM10 concentration in µg/m³
    pub pm10: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

/// Station paired with its current reading, the unit the registry stores
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservedStation {
    pub station: Station,
    pub reading: Reading,
}

impl ObservedStation {
    #[must_use]
    pub fn new(station: Station, reading: Reading) -> Self {
        Self { station, reading }
    }
}

impl AsRef<Station> for Station {
    fn as_ref(&self) -> &Station {
        self
    }
}

impl AsRef<Station> for ObservedStation {
    fn as_ref(&self) -> &Station {
        &self.station
    }
}
