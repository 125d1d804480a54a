//! Indian National AQI category bands

use serde::{Deserialize, Serialize};

use crate::models::AqiCategory;
use crate::{AirWatchError, Result};

/// Category and canned health advice for one AQI value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classification {
    pub category: AqiCategory,
    pub health_message: String,
}

/// Map an AQI value onto its severity band.
///
/// Bands are closed with an inclusive lower bound: 0-50 Good, 51-100
/// Satisfactory, 101-200 Moderate, 201-300 Poor, 301-400 Very Poor and
/// anything above 400 Severe. Negative values are an upstream data bug and
/// are rejected rather than clamped.
pub fn classify(aqi: i32) -> Result<Classification> {
    let category = match aqi {
        i32::MIN..=-1 => {
            tracing::error!(aqi, "Negative AQI reached the classifier");
            return Err(AirWatchError::invalid_measurement(format!(
                "AQI must not be negative, got {aqi}"
            )));
        }
        0..=50 => AqiCategory::Good,
        51..=100 => AqiCategory::Satisfactory,
        101..=200 => AqiCategory::Moderate,
        201..=300 => AqiCategory::Poor,
        301..=400 => AqiCategory::VeryPoor,
        401..=i32::MAX => AqiCategory::Severe,
    };

    Ok(Classification {
        category,
        health_message: category.health_message().to_string(),
    })
}

/// Classification for an optional index; absent values are `Unavailable`
pub fn classify_optional(aqi: Option<i32>) -> Result<Classification> {
    match aqi {
        Some(value) => classify(value),
        None => Ok(Classification {
            category: AqiCategory::Unavailable,
            health_message: AqiCategory::Unavailable.health_message().to_string(),
        }),
    }
}
