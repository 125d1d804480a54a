//! Multi-source reconciliation into a single headline AQI

use chrono::{DateTime, Utc};

use super::classifier::{classify, classify_optional};
use super::normalizer::NormalizedReading;
use crate::Result;
use crate::models::{AggregateResult, AqiCategory, AqiSource, ResolvedSourceResult, Station};

/// Label used when no upstream contributed an index
pub const UNAVAILABLE_SOURCE_LABEL: &str = "System";

/// Build the per-source record for a resolved station.
///
/// The category is classified from this source's own effective index, so a
/// negative upstream value fails here with `InvalidMeasurement`.
pub fn resolve_source(
    station: &Station,
    distance_km: f64,
    observed_at: DateTime<Utc>,
    normalized: NormalizedReading,
) -> Result<ResolvedSourceResult> {
    let classification = classify_optional(normalized.aqi)?;

    Ok(ResolvedSourceResult {
        source: station.source,
        station_id: station.id.clone(),
        station_name: station.name.clone(),
        station_distance_km: (distance_km * 10.0).round() / 10.0,
        aqi: normalized.aqi,
        aqi_raw: normalized.aqi_raw,
        aqi_cpcb: normalized.aqi_cpcb,
        category: classification.category,
        health_message: classification.health_message,
        pm25: normalized.pm25,
        pm10: normalized.pm10,
        timestamp_utc: observed_at,
        age_hours: normalized.age_hours,
        is_stale: normalized.is_stale,
    })
}

/// Pick the primary source: an index must be present, then the fresher
/// reading wins, and WAQI wins ties.
fn select_primary<'a>(
    waqi: Option<&'a ResolvedSourceResult>,
    openaq: Option<&'a ResolvedSourceResult>,
) -> Option<(&'a ResolvedSourceResult, i32)> {
    let waqi = waqi.and_then(|r| r.aqi.map(|aqi| (r, aqi)));
    let openaq = openaq.and_then(|r| r.aqi.map(|aqi| (r, aqi)));

    match (waqi, openaq) {
        (Some(w), Some(o)) => {
            if o.0.age_hours < w.0.age_hours {
                Some(o)
            } else {
                Some(w)
            }
        }
        (w, o) => w.or(o),
    }
}

fn source_label(primary: &ResolvedSourceResult, secondary: Option<&ResolvedSourceResult>) -> String {
    let mut label = if primary.station_name.is_empty() {
        primary.source.label().to_string()
    } else {
        format!("{} - {}", primary.source.label(), primary.station_name)
    };

    if let Some(secondary) = secondary.filter(|s| s.aqi.is_some()) {
        label.push_str(&format!(" (+ {})", secondary.source.label()));
    }
    label
}

/// Combine the per-source results into one response.
///
/// Both inputs are always carried through verbatim; only the headline
/// fields depend on the primary choice.
pub fn aggregate(
    waqi: Option<ResolvedSourceResult>,
    openaq: Option<ResolvedSourceResult>,
) -> Result<AggregateResult> {
    let Some((primary, aqi)) = select_primary(waqi.as_ref(), openaq.as_ref()) else {
        return Ok(AggregateResult {
            aqi: None,
            category: AqiCategory::Unavailable,
            health_message: AqiCategory::Unavailable.health_message().to_string(),
            pm25: None,
            pm10: None,
            source: UNAVAILABLE_SOURCE_LABEL.to_string(),
            station_name: None,
            primary_source: None,
            waqi,
            openaq,
        });
    };

    let classification = classify(aqi)?;
    let secondary = match primary.source {
        AqiSource::Waqi => openaq.as_ref(),
        AqiSource::OpenAq => waqi.as_ref(),
    };

    let source = source_label(primary, secondary);
    let pm25 = primary.pm25;
    let pm10 = primary.pm10;
    let station_name = Some(primary.station_name.clone());
    let primary_source = Some(primary.source);

    Ok(AggregateResult {
        aqi: Some(aqi),
        category: classification.category,
        health_message: classification.health_message,
        pm25,
        pm10,
        source,
        station_name,
        primary_source,
        waqi,
        openaq,
    })
}
