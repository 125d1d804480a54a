//! Reading normalization: effective index, age and staleness

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cpcb;
use crate::models::Reading;

/// Source-independent view of a reading at a given instant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedReading {
    /// CPCB index when particulates are known, otherwise the upstream index
    pub aqi: Option<i32>,
    pub aqi_raw: Option<i32>,
    pub aqi_cpcb: Option<i32>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub age_hours: f64,
    pub is_stale: bool,
}

/// Hours between two instants, clamped at zero and rounded to 2 decimals
#[must_use]
pub fn age_hours(observed_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - observed_at).num_milliseconds().max(0);
    let hours = millis as f64 / 3_600_000.0;
    (hours * 100.0).round() / 100.0
}

/// Normalize a raw reading relative to `now`.
///
/// Clock skew never yields a negative age and missing particulates stay
/// missing; zero is a real measurement.
#[must_use]
pub fn normalize(
    reading: &Reading,
    now: DateTime<Utc>,
    stale_threshold_hours: f64,
) -> NormalizedReading {
    let age_hours = age_hours(reading.observed_at, now);
    let aqi_cpcb = cpcb::aqi_from_particulates(reading.pm25, reading.pm10);

    NormalizedReading {
        aqi: aqi_cpcb.or(reading.aqi),
        aqi_raw: reading.aqi,
        aqi_cpcb,
        pm25: reading.pm25,
        pm10: reading.pm10,
        age_hours,
        is_stale: age_hours > stale_threshold_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn reading(
        aqi: Option<i32>,
        pm25: Option<f64>,
        pm10: Option<f64>,
        observed_at: DateTime<Utc>,
    ) -> Reading {
        Reading {
            station_id: "waqi-1".to_string(),
            aqi,
            pm25,
            pm10,
            observed_at,
        }
    }

    #[test]
    fn test_age_and_staleness() {
        let observed = now() - Duration::minutes(90);
        let normalized = normalize(&reading(Some(80), None, None, observed), now(), 1.0);
        assert_eq!(normalized.age_hours, 1.5);
        assert!(normalized.is_stale);

        let normalized = normalize(&reading(Some(80), None, None, observed), now(), 1.5);
        assert!(!normalized.is_stale, "threshold is exclusive");
    }

    #[test]
    fn test_future_timestamp_clamps_to_zero() {
        let observed = now() + Duration::hours(3);
        let normalized = normalize(&reading(Some(80), None, None, observed), now(), 0.0);
        assert_eq!(normalized.age_hours, 0.0);
        assert!(!normalized.is_stale);
    }

    #[test]
    fn test_missing_particulates_pass_through() {
        let normalized = normalize(&reading(Some(120), None, Some(0.0), now()), now(), 6.0);
        assert_eq!(normalized.pm25, None);
        assert_eq!(normalized.pm10, Some(0.0));
        assert_eq!(normalized.aqi_cpcb, Some(0));
        assert_eq!(normalized.aqi, Some(0));
        assert_eq!(normalized.aqi_raw, Some(120));
    }

    #[test]
    fn test_upstream_index_used_without_particulates() {
        let normalized = normalize(&reading(Some(173), None, None, now()), now(), 6.0);
        assert_eq!(normalized.aqi, Some(173));
        assert_eq!(normalized.aqi_cpcb, None);
    }

    #[test]
    fn test_no_data_at_all() {
        let normalized = normalize(&reading(None, None, None, now()), now(), 6.0);
        assert_eq!(normalized.aqi, None);
        assert_eq!(normalized.pm25, None);
        assert_eq!(normalized.pm10, None);
    }
}
