//! Integration tests for the AirWatch HTTP API

use airwatch::api::{self, ApiError, AppState, HealthResponse};
use airwatch::models::{ObservedStation, Reading};
use airwatch::{
    AggregateResult, AqiCategory, AqiService, AqiSettings, AqiSource, MapPoint, ResponseCache,
    Station, StationRegistry,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn observed(
    id: &str,
    source: AqiSource,
    name: &str,
    (latitude, longitude): (f64, f64),
    aqi: Option<i32>,
    pm25: Option<f64>,
    age_hours: i64,
) -> ObservedStation {
    ObservedStation::new(
        Station {
            id: id.to_string(),
            source,
            latitude,
            longitude,
            name: name.to_string(),
        },
        Reading {
            station_id: id.to_string(),
            aqi,
            pm25,
            pm10: None,
            observed_at: Utc::now() - Duration::hours(age_hours),
        },
    )
}

fn publish(registry: &StationRegistry, stations: Vec<ObservedStation>) {
    let mut updates: HashMap<AqiSource, Vec<ObservedStation>> = HashMap::new();
    for station in stations {
        updates.entry(station.station.source).or_default().push(station);
    }
    if !updates.is_empty() {
        registry.publish(updates, Utc::now());
    }
}

fn app(stations: Vec<ObservedStation>) -> axum::Router {
    let registry = Arc::new(StationRegistry::new());
    publish(&registry, stations);
    let service = AqiService::new(registry, AqiSettings::default());
    api::router(AppState::new(service, None))
}

fn kochi_stations() -> Vec<ObservedStation> {
    vec![
        observed(
            "waqi_11276",
            AqiSource::Waqi,
            "Vyttila, Kochi",
            (9.9816, 76.2999),
            Some(87),
            None,
            1,
        ),
        observed(
            "openaq_2178",
            AqiSource::OpenAq,
            "Kacheripady",
            (9.9858, 76.2829),
            None,
            Some(20.0),
            3,
        ),
    ]
}

async fn get<T: DeserializeOwned>(app: axum::Router, uri: &str) -> (StatusCode, T) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_current_aqi_combines_sources() {
    let (status, body): (_, AggregateResult) =
        get(app(kochi_stations()), "/aqi/current?lat=9.9312&lng=76.2673").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.aqi, Some(87));
    assert_eq!(body.category, AqiCategory::Satisfactory);
    assert_eq!(body.primary_source, Some(AqiSource::Waqi));
    assert_eq!(body.source, "WAQI - Vyttila, Kochi (+ OpenAQ)");

    let openaq = body.openaq.unwrap();
    assert_eq!(openaq.aqi_cpcb, Some(33));
    assert_eq!(openaq.pm25, Some(20.0));
    assert!(!openaq.is_stale);
}

#[tokio::test]
async fn test_current_aqi_wire_shape() {
    let (status, body): (_, serde_json::Value) =
        get(app(kochi_stations()), "/aqi/current?lat=9.9312&lng=76.2673").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["primary_source"], "WAQI");
    assert_eq!(body["openaq"]["source"], "OPENAQ");
    assert_eq!(body["waqi"]["category"], "Satisfactory");
    for field in ["station_distance_km", "aqi_raw", "timestamp_utc", "age_hours", "is_stale"] {
        assert!(body["waqi"].get(field).is_some(), "missing {field}");
    }
}

#[tokio::test]
async fn test_current_aqi_unavailable_when_no_station_in_range() {
    let (status, body): (_, AggregateResult) =
        get(app(kochi_stations()), "/aqi/current?lat=28.6139&lng=77.2090").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.aqi, None);
    assert_eq!(body.category, AqiCategory::Unavailable);
    assert!(body.waqi.is_none());
    assert!(body.openaq.is_none());
}

#[tokio::test]
async fn test_current_aqi_missing_parameter() {
    let (status, body): (_, ApiError) = get(app(vec![]), "/aqi/current?lat=9.93").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.code, "BAD_REQUEST");

    let (status, _): (_, ApiError) = get(app(vec![]), "/aqi/current?lat=abc&lng=76.2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_current_aqi_invalid_coordinate() {
    let (status, body): (_, ApiError) = get(app(vec![]), "/aqi/current?lat=95&lng=76.2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.code, "INVALID_COORDINATE");
}

#[tokio::test]
async fn test_current_aqi_invalid_measurement() {
    let stations = vec![observed(
        "waqi_1",
        AqiSource::Waqi,
        "Broken",
        (9.93, 76.27),
        Some(-7),
        None,
        1,
    )];
    let (status, body): (_, ApiError) =
        get(app(stations), "/aqi/current?lat=9.93&lng=76.27").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.code, "INVALID_MEASUREMENT");
}

#[tokio::test]
async fn test_all_aqi_lists_recent_locations() {
    let mut stations = kochi_stations();
    stations.push(observed(
        "waqi_old",
        AqiSource::Waqi,
        "Eloor",
        (10.0159, 76.3419),
        Some(120),
        None,
        48,
    ));

    let (status, points): (_, Vec<MapPoint>) = get(app(stations), "/aqi/all").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].location_name, "Vyttila, Kochi");
    assert_eq!(points[0].aqi, 87);
    assert_eq!(points[0].color, "Light Green");
    assert_eq!(points[1].location_name, "Kacheripady");
    assert_eq!(points[1].aqi, 33);
    assert_eq!(points[1].color, "Green");
    assert_eq!(points[1].source, AqiSource::OpenAq);
}

#[tokio::test]
async fn test_health() {
    let (status, body): (_, HealthResponse) = get(app(kochi_stations()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.status, "ok");
    assert_eq!(body.version, airwatch::VERSION);
    assert_eq!(body.waqi_stations, 1);
    assert_eq!(body.openaq_stations, 1);
    assert!(body.refreshed_at.is_some());

    let (_, body): (_, HealthResponse) = get(app(vec![]), "/health").await;
    assert_eq!(body.waqi_stations, 0);
    assert!(body.refreshed_at.is_none());
}

#[tokio::test]
async fn test_current_aqi_served_from_cache_per_grid_cell() {
    let dir = TempDir::new().unwrap();
    let cache = ResponseCache::open(dir.path(), std::time::Duration::from_secs(300)).unwrap();
    let registry = Arc::new(StationRegistry::new());
    publish(&registry, kochi_stations());
    let service = AqiService::new(Arc::clone(&registry), AqiSettings::default());
    let app = api::router(AppState::new(service, Some(cache.clone())));

    let (status, first): (_, AggregateResult) =
        get(app.clone(), "/aqi/current?lat=9.9312&lng=76.2673").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first.aqi, Some(87));

    let cached: Option<AggregateResult> = cache.get("aqi:9.93:76.27").await.unwrap();
    assert_eq!(cached.as_ref(), Some(&first));

    publish(
        &registry,
        vec![observed(
            "waqi_11276",
            AqiSource::Waqi,
            "Vyttila, Kochi",
            (9.9816, 76.2999),
            Some(250),
            None,
            0,
        )],
    );

    // Same 0.01° cell: answered from the cache despite the new reading.
    let (status, second): (_, AggregateResult) =
        get(app.clone(), "/aqi/current?lat=9.9349&lng=76.2671").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, first);

    // Neighbouring cell: computed from the registry.
    let (_, fresh): (_, AggregateResult) =
        get(app, "/aqi/current?lat=9.9412&lng=76.2673").await;
    assert_eq!(fresh.aqi, Some(250));
    assert_eq!(fresh.category, AqiCategory::Poor);
}

#[tokio::test]
async fn test_current_aqi_ignores_unreadable_cache_entry() {
    let dir = TempDir::new().unwrap();
    let cache = ResponseCache::open(dir.path(), std::time::Duration::from_secs(300)).unwrap();
    cache
        .put("aqi:9.93:76.27", vec![u8::MAX; 3])
        .await
        .unwrap();

    let registry = Arc::new(StationRegistry::new());
    publish(&registry, kochi_stations());
    let service = AqiService::new(registry, AqiSettings::default());
    let app = api::router(AppState::new(service, Some(cache)));

    let (status, body): (_, AggregateResult) =
        get(app, "/aqi/current?lat=9.9312&lng=76.2673").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.aqi, Some(87));
}
