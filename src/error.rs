//! Error types and handling for the `AirWatch` service

use thiserror::Error;

/// Main error type for the `AirWatch` service
#[derive(Error, Debug)]
pub enum AirWatchError {
    /// Query coordinates outside the valid latitude/longitude ranges
    #[error("Invalid coordinate: {message}")]
    InvalidCoordinate { message: String },

    /// Measurement values that cannot be classified (e.g. a negative AQI)
    #[error("Invalid measurement: {message}")]
    InvalidMeasurement { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Upstream air quality API errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Upstream payloads or seed files that do not parse
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Response cache errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AirWatchError {
    /// Create a new invalid coordinate error
    pub fn invalid_coordinate<S: Into<String>>(message: S) -> Self {
        Self::InvalidCoordinate {
            message: message.into(),
        }
    }

    /// Create a new invalid measurement error
    pub fn invalid_measurement<S: Into<String>>(message: S) -> Self {
        Self::InvalidMeasurement {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            AirWatchError::InvalidCoordinate { message } => {
                format!("Invalid coordinates: {message}")
            }
            AirWatchError::InvalidMeasurement { .. } => {
                "Air quality data for this area is malformed. Please try again later.".to_string()
            }
            AirWatchError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            AirWatchError::Api { .. } => {
                "Unable to reach air quality providers. Please try again later.".to_string()
            }
            AirWatchError::Parse { .. } => {
                "Received unexpected data from an air quality provider.".to_string()
            }
            AirWatchError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
            AirWatchError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<postcard::Error> for AirWatchError {
    fn from(err: postcard::Error) -> Self {
        AirWatchError::cache(format!("Failed to encode cache entry: {err}"))
    }
}

impl From<reqwest_middleware::Error> for AirWatchError {
    fn from(err: reqwest_middleware::Error) -> Self {
        AirWatchError::api(format!("Request failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let coord_err = AirWatchError::invalid_coordinate("latitude 91 out of range");
        assert!(matches!(coord_err, AirWatchError::InvalidCoordinate { .. }));

        let measurement_err = AirWatchError::invalid_measurement("negative AQI -3");
        assert!(matches!(
            measurement_err,
            AirWatchError::InvalidMeasurement { .. }
        ));

        let api_err = AirWatchError::api("connection failed");
        assert!(matches!(api_err, AirWatchError::Api { .. }));
    }

    #[test]
    fn test_user_messages() {
        let coord_err = AirWatchError::invalid_coordinate("latitude 91 out of range");
        assert!(coord_err.user_message().contains("latitude 91"));

        let api_err = AirWatchError::api("test");
        assert!(api_err.user_message().contains("Unable to reach"));

        let config_err = AirWatchError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AirWatchError = io_err.into();
        assert!(matches!(err, AirWatchError::Io { .. }));
    }
}
