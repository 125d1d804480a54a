//! `AirWatch` - Multi-source air quality aggregation
//!
//! This library ingests monitoring stations from WAQI and OpenAQ, resolves
//! the nearest station of each source for a query point, and reconciles both
//! into one Indian National AQI reading.

pub mod api;
pub mod aqi;
pub mod cache;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod registry;
pub mod web;

// Re-export core types for public API
pub use aqi::{AqiService, AqiSettings, aggregate, classify, normalize, resolve};
pub use cache::ResponseCache;
pub use config::AirWatchConfig;
pub use error::AirWatchError;
pub use models::{AggregateResult, AqiCategory, AqiSource, Coordinates, MapPoint, Station};
pub use registry::StationRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AirWatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
