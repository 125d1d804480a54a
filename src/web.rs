use anyhow::{Context, Result};
use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::aqi::{AqiService, AqiSettings};
use crate::cache::ResponseCache;
use crate::config::AirWatchConfig;
use crate::ingest;
use crate::registry::StationRegistry;

fn open_cache(config: &AirWatchConfig) -> Option<ResponseCache> {
    if !config.cache.enabled {
        info!("Response cache disabled");
        return None;
    }

    let dir = config.cache_dir();
    let ttl = Duration::from_secs(config.cache.ttl_seconds.into());
    match ResponseCache::open(&dir, ttl) {
        Ok(cache) => {
            info!(path = %dir.display(), ttl_seconds = config.cache.ttl_seconds, "Response cache opened");
            Some(cache)
        }
        Err(e) => {
            warn!(path = %dir.display(), "Running without response cache: {}", e);
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub async fn run(config: AirWatchConfig) -> Result<()> {
    let registry = Arc::new(StationRegistry::new());

    let feeds = ingest::feeds_from_config(&config.ingest)
        .context("Failed to set up station feeds")?;
    let refresh_interval =
        Duration::from_secs(u64::from(config.ingest.refresh_interval_minutes) * 60);
    tokio::spawn(ingest::run_refresh_loop(
        Arc::clone(&registry),
        feeds,
        refresh_interval,
    ));

    let service = AqiService::new(registry, AqiSettings::from(&config.aqi));
    let state = AppState::new(service, open_cache(&config));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.request_timeout_seconds.into()),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("AirWatch API running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
