//! Persistent TTL cache for AQI responses
//!
//! Entries live in a `fjall` keyspace encoded with `postcard` next to their
//! expiry time. Store access is blocking and runs on the blocking pool.

use fjall::Keyspace;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task;

use crate::{AirWatchError, Result};

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: u64, // Unix timestamp (milliseconds)
}

fn unix_millis(time: SystemTime) -> Result<u64> {
    let elapsed = time
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AirWatchError::cache(format!("System clock before epoch: {e}")))?;
    Ok(elapsed.as_millis() as u64)
}

fn store_error(err: impl std::fmt::Display) -> AirWatchError {
    AirWatchError::cache(err.to_string())
}

fn join_error(err: task::JoinError) -> AirWatchError {
    AirWatchError::cache(format!("Cache task failed: {err}"))
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key).map_err(store_error)?.map(|v| v.to_vec()))
}

/// Key/value response cache with per-entry expiry
#[derive(Clone)]
pub struct ResponseCache {
    store: Keyspace,
    ttl: Duration,
}

impl ResponseCache {
    /// Open (or create) the cache database under `path`
    pub fn open(path: impl AsRef<Path>, ttl: Duration) -> Result<Self> {
        let db = fjall::Database::builder(&path).open().map_err(store_error)?;
        let items = db
            .keyspace("aqi_responses", fjall::KeyspaceCreateOptions::default)
            .map_err(store_error)?;
        Ok(ResponseCache { store: items, ttl })
    }

    /// Stores a serializable value for the cache TTL.
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub async fn put<T: Serialize + Send + Debug + 'static>(&self, key: &str, value: T) -> Result<()> {
        self.put_with_ttl(key, value, self.ttl).await
    }

    /// Stores a serializable value with an explicit time-to-live.
    pub async fn put_with_ttl<T: Serialize + Send + Debug + 'static>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = SystemTime::now()
            .checked_add(ttl)
            .ok_or_else(|| AirWatchError::cache("TTL overflow"))?;
        let entry = StoredEntry {
            value,
            expires_at: unix_millis(expires_at)?,
        };
        let bytes = postcard::to_stdvec(&entry)?;

        task::spawn_blocking(move || store.insert(key, bytes))
            .await
            .map_err(join_error)?
            .map_err(store_error)?;
        Ok(())
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes))
                .await
                .map_err(join_error)??;

        let Some(bytes) = maybe_bytes else {
            tracing::debug!("Key not found");
            return Ok(None);
        };

        let now = unix_millis(SystemTime::now())?;
        match postcard::from_bytes::<StoredEntry<T>>(&bytes) {
            Ok(entry) if now < entry.expires_at => {
                tracing::debug!("Key found and still fresh");
                Ok(Some(entry.value))
            }
            Ok(_) => {
                tracing::debug!("Key found but expired");
                self.remove(key).await?;
                Ok(None)
            }
            Err(e) => {
                // Entries written by an older layout are dropped, not fatal.
                tracing::warn!("Discarding undecodable cache entry: {}", e);
                self.remove(key).await?;
                Ok(None)
            }
        }
    }

    /// Manually removes a key from the cache.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key))
            .await
            .map_err(join_error)?
            .map_err(store_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        aqi: Option<i32>,
        label: String,
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::open(dir.path(), Duration::from_secs(300)).unwrap();

        let sample = Sample {
            aqi: Some(87),
            label: "WAQI - Kochi".to_string(),
        };
        cache.put("aqi:9.93:76.27", sample).await.unwrap();

        let cached: Option<Sample> = cache.get("aqi:9.93:76.27").await.unwrap();
        assert_eq!(
            cached,
            Some(Sample {
                aqi: Some(87),
                label: "WAQI - Kochi".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_missing_key() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::open(dir.path(), Duration::from_secs(300)).unwrap();
        let cached: Option<Sample> = cache.get("aqi:0.00:0.00").await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::open(dir.path(), Duration::from_secs(300)).unwrap();

        cache
            .put_with_ttl(
                "aqi:1.00:1.00",
                Sample {
                    aqi: None,
                    label: "System".to_string(),
                },
                Duration::ZERO,
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let cached: Option<Sample> = cache.get("aqi:1.00:1.00").await.unwrap();
        assert!(cached.is_none());
    }
}
