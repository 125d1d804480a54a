//! Data models for the AirWatch service
//!
//! This module contains the core domain models organized by concern:
//! - Location: validated coordinates and great-circle distance
//! - Station: monitoring stations, their sources and latest readings
//! - AQI: per-source and aggregated results served over HTTP

pub mod aqi;
pub mod location;
pub mod station;

// Re-export all public types for convenient access
pub use aqi::{AggregateResult, AqiCategory, MapPoint, ResolvedSourceResult};
pub use location::Coordinates;
pub use station::{AqiSource, ObservedStation, Reading, Station};
