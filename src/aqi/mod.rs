//! AQI aggregation module
//!
//! This module turns per-source station readings into the unified answer
//! served to the frontend:
//! - Resolver: nearest station per source within a radius
//! - Normalizer: effective index, reading age and staleness
//! - Aggregator: primary source selection and provenance label
//! - Classifier: Indian National AQI category bands
//! - CPCB: sub-index calculation from PM2.5 / PM10

pub mod aggregator;
pub mod classifier;
pub mod cpcb;
pub mod normalizer;
pub mod resolver;
pub mod service;

// Re-export commonly used types from submodules
pub use aggregator::{aggregate, resolve_source};
pub use classifier::{Classification, classify};
pub use cpcb::aqi_from_particulates;
pub use normalizer::{NormalizedReading, normalize};
pub use resolver::{NearestStation, resolve};
pub use service::{AqiService, AqiSettings};
