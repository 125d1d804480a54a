//! Station registry holding the latest published snapshot of every source
//!
//! Readers grab an `Arc` to the current snapshot and work on it without
//! holding any lock. Refreshes build a complete new snapshot and swap it in,
//! so a request never observes a station list mid-update.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{AqiSource, ObservedStation};

/// Immutable view of all stations at one point in time
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    waqi: Vec<ObservedStation>,
    openaq: Vec<ObservedStation>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl RegistrySnapshot {
    /// Stations currently known for `source`
    #[must_use]
    pub fn stations(&self, source: AqiSource) -> &[ObservedStation] {
        match source {
            AqiSource::Waqi => &self.waqi,
            AqiSource::OpenAq => &self.openaq,
        }
    }

    /// All stations across sources
    pub fn all_stations(&self) -> impl Iterator<Item = &ObservedStation> {
        self.waqi.iter().chain(self.openaq.iter())
    }

    #[must_use]
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    fn stations_mut(&mut self, source: AqiSource) -> &mut Vec<ObservedStation> {
        match source {
            AqiSource::Waqi => &mut self.waqi,
            AqiSource::OpenAq => &mut self.openaq,
        }
    }
}

/// Shared registry of monitoring stations
#[derive(Debug, Default)]
pub struct StationRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl StationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current committed snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Replace the station lists of the given sources in one atomic swap.
    ///
    /// Sources missing from `updates` keep their previous stations. Stations
    /// whose coordinates are out of range or whose reading belongs to another
    /// station are dropped; the wrong source tag is rewritten to the feed's.
    pub fn publish(&self, updates: HashMap<AqiSource, Vec<ObservedStation>>, now: DateTime<Utc>) {
        let mut guard = self.current.write();
        let mut next = RegistrySnapshot::clone(&guard);

        for (source, stations) in updates {
            let received = stations.len();
            let accepted: Vec<ObservedStation> = stations
                .into_iter()
                .filter_map(|mut observed| {
                    if !observed.station.has_valid_position() {
                        warn!(
                            station = %observed.station.id,
                            "Dropping station with invalid coordinates"
                        );
                        return None;
                    }
                    if observed.reading.station_id != observed.station.id {
                        warn!(
                            station = %observed.station.id,
                            reading_station = %observed.reading.station_id,
                            "Dropping reading attached to the wrong station"
                        );
                        return None;
                    }
                    observed.station.source = source;
                    Some(observed)
                })
                .collect();

            debug!(%source, received, accepted = accepted.len(), "Publishing stations");
            *next.stations_mut(source) = accepted;
        }

        next.refreshed_at = Some(now);
        info!(
            waqi = next.waqi.len(),
            openaq = next.openaq.len(),
            "Published station registry snapshot"
        );
        *guard = Arc::new(next);
    }
}
