//! Configuration management for the `AirWatch` service
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::AirWatchError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `AirWatch` service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AirWatchConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Aggregation tunables
    pub aqi: AqiConfig,
    /// Station ingestion settings
    pub ingest: IngestConfig,
    /// Response cache settings
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests running longer than this are aborted
    pub request_timeout_seconds: u32,
}

/// Aggregation tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AqiConfig {
    /// WAQI stations farther than this are ignored
    pub waqi_max_radius_km: f64,
    /// OpenAQ stations farther than this are ignored
    pub openaq_max_radius_km: f64,
    /// Readings older than this are flagged stale
    pub stale_threshold_hours: f64,
    /// Readings older than this are left off the map layer
    pub map_max_age_hours: f64,
}

/// Geographic area the ingestion feeds cover
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

/// Station ingestion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Minutes between registry refreshes
    pub refresh_interval_minutes: u32,
    /// Upstream request timeout in seconds
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    pub max_retries: u32,
    /// Area of interest
    pub bounds: BoundingBox,
    pub waqi_base_url: String,
    /// WAQI feed is disabled without a token
    pub waqi_token: Option<String>,
    pub openaq_base_url: String,
    /// OpenAQ feed is disabled without a key
    pub openaq_api_key: Option<String>,
    /// Upper bound on OpenAQ locations queried per refresh
    pub openaq_max_locations: u32,
    /// JSON file of stations loaded on every refresh
    pub seed_file: Option<PathBuf>,
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Cache TTL in seconds
    pub ttl_seconds: u32,
    /// Cache directory location
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

/// Upper bound of the `/aqi/all` window (one year)
const MAX_MAP_WINDOW_HOURS: f64 = 8_760.0;

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_request_timeout() -> u32 {
    15
}

fn default_waqi_radius() -> f64 {
    100.0
}

fn default_openaq_radius() -> f64 {
    25.0
}

fn default_stale_threshold() -> f64 {
    43_800.0
}

fn default_map_max_age() -> f64 {
    24.0
}

fn default_refresh_interval() -> u32 {
    15
}

fn default_ingest_timeout() -> u32 {
    10
}

fn default_ingest_max_retries() -> u32 {
    3
}

/// Kerala, where the municipal deployment lives
fn default_bounds() -> BoundingBox {
    BoundingBox {
        south: 8.17,
        west: 74.85,
        north: 12.8,
        east: 77.42,
    }
}

fn default_waqi_base_url() -> String {
    "https://api.waqi.info".to_string()
}

fn default_openaq_base_url() -> String {
    "https://api.openaq.org/v3".to_string()
}

fn default_openaq_max_locations() -> u32 {
    100
}

fn default_cache_ttl() -> u32 {
    300
}

fn default_cache_location() -> String {
    "~/.cache/airwatch".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for AqiConfig {
    fn default() -> Self {
        Self {
            waqi_max_radius_km: default_waqi_radius(),
            openaq_max_radius_km: default_openaq_radius(),
            stale_threshold_hours: default_stale_threshold(),
            map_max_age_hours: default_map_max_age(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            refresh_interval_minutes: default_refresh_interval(),
            timeout_seconds: default_ingest_timeout(),
            max_retries: default_ingest_max_retries(),
            bounds: default_bounds(),
            waqi_base_url: default_waqi_base_url(),
            waqi_token: None,
            openaq_base_url: default_openaq_base_url(),
            openaq_api_key: None,
            openaq_max_locations: default_openaq_max_locations(),
            seed_file: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
            location: default_cache_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AirWatchConfig {
    /// Load configuration from `config_path`, the user config directory or
    /// `./config.toml`, in that order, then apply environment overrides
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. AIRWATCH_INGEST__WAQI_TOKEN
        builder = builder.add_source(
            Environment::with_prefix("AIRWATCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AirWatchConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("airwatch").join("config.toml"))
    }

    /// Expand a leading `~` in the cache location
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        match self.cache.location.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(rest)),
            None => PathBuf::from(&self.cache.location),
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_host();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.ingest.refresh_interval_minutes == 0 {
            self.ingest.refresh_interval_minutes = default_refresh_interval();
        }
        if self.ingest.timeout_seconds == 0 {
            self.ingest.timeout_seconds = default_ingest_timeout();
        }
        if self.ingest.waqi_base_url.is_empty() {
            self.ingest.waqi_base_url = default_waqi_base_url();
        }
        if self.ingest.openaq_base_url.is_empty() {
            self.ingest.openaq_base_url = default_openaq_base_url();
        }
        if self.ingest.openaq_max_locations == 0 {
            self.ingest.openaq_max_locations = default_openaq_max_locations();
        }
        if self.cache.ttl_seconds == 0 {
            self.cache.ttl_seconds = default_cache_ttl();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        // Empty credentials from the environment mean "not configured".
        if self.ingest.waqi_token.as_deref() == Some("") {
            self.ingest.waqi_token = None;
        }
        if self.ingest.openaq_api_key.as_deref() == Some("") {
            self.ingest.openaq_api_key = None;
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_bounds()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.request_timeout_seconds > 300 {
            return Err(
                AirWatchError::config("Request timeout cannot exceed 300 seconds").into(),
            );
        }

        for (name, radius) in [
            ("WAQI", self.aqi.waqi_max_radius_km),
            ("OpenAQ", self.aqi.openaq_max_radius_km),
        ] {
            if !(radius > 0.0 && radius <= 500.0) {
                return Err(AirWatchError::config(format!(
                    "{name} search radius must be between 0 and 500 km"
                ))
                .into());
            }
        }

        if !(self.aqi.stale_threshold_hours >= 0.0) {
            return Err(AirWatchError::config("Stale threshold cannot be negative").into());
        }

        let window = self.aqi.map_max_age_hours;
        if !(window > 0.0 && window <= MAX_MAP_WINDOW_HOURS) {
            return Err(AirWatchError::config(format!(
                "Map window must be between 0 and {MAX_MAP_WINDOW_HOURS} hours"
            ))
            .into());
        }

        if self.ingest.max_retries > 10 {
            return Err(AirWatchError::config("Ingest max retries cannot exceed 10").into());
        }

        if self.ingest.timeout_seconds > 300 {
            return Err(
                AirWatchError::config("Ingest timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.cache.ttl_seconds > 86_400 {
            return Err(AirWatchError::config("Cache TTL cannot exceed 86400 seconds (1 day)").into());
        }

        Ok(())
    }

    /// Validate the ingestion bounding box
    fn validate_bounds(&self) -> Result<()> {
        let bounds = &self.ingest.bounds;
        let corners_valid = crate::models::Coordinates::new(bounds.south, bounds.west).is_ok()
            && crate::models::Coordinates::new(bounds.north, bounds.east).is_ok();

        if !corners_valid || bounds.south >= bounds.north || bounds.west >= bounds.east {
            return Err(AirWatchError::config(format!(
                "Invalid ingest bounds {bounds:?}: south/west must be below north/east"
            ))
            .into());
        }
        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AirWatchError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AirWatchError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("WAQI", &self.ingest.waqi_base_url),
            ("OpenAQ", &self.ingest.openaq_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AirWatchError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
