//! Seed-file feed for offline deployments and local development

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use super::StationFeed;
use crate::models::{AqiSource, ObservedStation};
use crate::{AirWatchError, Result};

/// Reads stations of one source from a JSON array of observed stations
pub struct SeedFileFeed {
    path: PathBuf,
    source: AqiSource,
}

impl SeedFileFeed {
    #[must_use]
    pub fn new(path: PathBuf, source: AqiSource) -> Self {
        Self { path, source }
    }

    fn parse(&self, content: &str) -> Result<Vec<ObservedStation>> {
        let stations: Vec<ObservedStation> = serde_json::from_str(content).map_err(|e| {
            AirWatchError::parse(format!(
                "Failed to parse seed file {}: {e}",
                self.path.display()
            ))
        })?;

        Ok(stations
            .into_iter()
            .filter(|observed| observed.station.source == self.source)
            .collect())
    }
}

#[async_trait]
impl StationFeed for SeedFileFeed {
    fn source(&self) -> AqiSource {
        self.source
    }

    fn name(&self) -> &str {
        "seed-file"
    }

    async fn fetch(&self) -> Result<Vec<ObservedStation>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let stations = self.parse(&content)?;
        debug!(
            path = %self.path.display(),
            source = %self.source,
            "Loaded {} stations from seed file",
            stations.len()
        );
        Ok(stations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SEED: &str = r#"[
        {
            "station": {"id": "waqi_11276", "source": "WAQI", "latitude": 9.9816, "longitude": 76.2999, "name": "Vyttila, Kochi"},
            "reading": {"station_id": "waqi_11276", "aqi": 87, "pm25": null, "pm10": null, "observed_at": "2026-03-01T04:30:00Z"}
        },
        {
            "station": {"id": "openaq_2178", "source": "OPENAQ", "latitude": 9.9858, "longitude": 76.2829, "name": "Kacheripady"},
            "reading": {"station_id": "openaq_2178", "aqi": null, "pm25": 41.5, "pm10": 88.0, "observed_at": "2026-03-01T05:00:00Z"}
        }
    ]"#;

    fn seed_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_filters_by_source() {
        let file = seed_file(SEED);

        let waqi = SeedFileFeed::new(file.path().to_path_buf(), AqiSource::Waqi);
        let stations = waqi.fetch().await.unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].station.id, "waqi_11276");
        assert_eq!(stations[0].reading.aqi, Some(87));

        let openaq = SeedFileFeed::new(file.path().to_path_buf(), AqiSource::OpenAq);
        let stations = openaq.fetch().await.unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].reading.pm25, Some(41.5));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let feed = SeedFileFeed::new("/nonexistent/stations.json".into(), AqiSource::Waqi);
        let result = feed.fetch().await;
        assert!(matches!(result, Err(AirWatchError::Io { .. })));
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let file = seed_file("{not json");
        let feed = SeedFileFeed::new(file.path().to_path_buf(), AqiSource::Waqi);
        let result = feed.fetch().await;
        assert!(matches!(result, Err(AirWatchError::Parse { .. })));
    }
}
