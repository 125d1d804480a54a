//! Station ingestion
//!
//! Feeds pull station lists from upstream providers (or a seed file) and the
//! refresher publishes them into the registry on a fixed cadence. A failing
//! feed never propagates past the refresher: its source keeps the previously
//! published stations, even when other feeds of that source succeeded.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use rand::RngExt;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::config::IngestConfig;
use crate::models::{AqiSource, ObservedStation};
use crate::registry::StationRegistry;
use crate::{AirWatchError, Result};

pub mod file;
pub mod openaq;
pub mod waqi;

pub use file::SeedFileFeed;
pub use openaq::OpenAqFeed;
pub use waqi::WaqiFeed;

const USER_AGENT: &str = concat!("AirWatch/", env!("CARGO_PKG_VERSION"));

/// A provider of monitoring stations for one source
#[async_trait]
pub trait StationFeed: Send + Sync {
    /// Source every station of this feed belongs to
    fn source(&self) -> AqiSource;

    /// Short name for logs
    fn name(&self) -> &str;

    /// Fetch the current stations and their latest readings
    async fn fetch(&self) -> Result<Vec<ObservedStation>>;
}

/// HTTP client with retry on transient failures, shared by all feeds
pub fn build_http_client(config: &IngestConfig) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds.into()))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AirWatchError::config(format!("Failed to create HTTP client: {e}")))?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Feeds enabled by the configuration: the seed file (if any) plus every
/// upstream whose credentials are present
pub fn feeds_from_config(config: &IngestConfig) -> Result<Vec<Box<dyn StationFeed>>> {
    let mut feeds: Vec<Box<dyn StationFeed>> = Vec::new();

    if let Some(path) = &config.seed_file {
        for source in AqiSource::ALL {
            feeds.push(Box::new(SeedFileFeed::new(path.clone(), source)));
        }
    }

    let client = build_http_client(config)?;

    match &config.waqi_token {
        Some(token) => feeds.push(Box::new(WaqiFeed::new(
            client.clone(),
            config.waqi_base_url.clone(),
            token.clone(),
            config.bounds,
        ))),
        None => info!("WAQI feed disabled: no token configured"),
    }

    match &config.openaq_api_key {
        Some(api_key) => feeds.push(Box::new(OpenAqFeed::new(
            client,
            config.openaq_base_url.clone(),
            api_key.clone(),
            config.bounds,
            config.openaq_max_locations,
        ))),
        None => info!("OpenAQ feed disabled: no API key configured"),
    }

    Ok(feeds)
}

/// Fetch every feed once and publish the results as one snapshot.
///
/// Stations of feeds sharing a source are merged. A source is only replaced
/// when every one of its feeds succeeded; otherwise it keeps the previously
/// published stations.
#[instrument(skip_all, fields(feeds = feeds.len()))]
pub async fn refresh_once(registry: &StationRegistry, feeds: &[Box<dyn StationFeed>]) {
    let results = join_all(feeds.iter().map(|feed| async move {
        let outcome = feed.fetch().await;
        (feed.source(), feed.name(), outcome)
    }))
    .await;

    let mut updates: HashMap<AqiSource, Vec<ObservedStation>> = HashMap::new();
    let mut failed: HashSet<AqiSource> = HashSet::new();
    for (source, name, outcome) in results {
        match outcome {
            Ok(stations) => {
                info!(feed = name, %source, stations = stations.len(), "Feed refreshed");
                updates.entry(source).or_default().extend(stations);
            }
            Err(e) => {
                warn!(feed = name, %source, "Feed refresh failed, keeping previous stations: {}", e);
                failed.insert(source);
            }
        }
    }
    updates.retain(|source, _| !failed.contains(source));

    if updates.is_empty() {
        warn!("No feed produced data this cycle");
        return;
    }
    registry.publish(updates, Utc::now());
}

/// Refresh the registry forever, sleeping `interval` (±10%) between cycles
pub async fn run_refresh_loop(
    registry: Arc<StationRegistry>,
    feeds: Vec<Box<dyn StationFeed>>,
    interval: Duration,
) {
    if feeds.is_empty() {
        warn!("No station feeds configured; the registry will stay empty");
        return;
    }

    loop {
        refresh_once(&registry, &feeds).await;

        let jitter: f32 = rand::rng().random_range(0.9..1.1);
        tokio::time::sleep(interval.mul_f32(jitter)).await;
    }
}
