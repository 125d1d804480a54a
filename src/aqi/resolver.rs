//! Nearest-station lookup per data source

use crate::models::{Coordinates, Station};

/// Distances closer than this are treated as equal for tie-breaking
const DISTANCE_EPSILON_KM: f64 = 1e-9;

/// Closest candidate together with its great-circle distance
#[derive(Debug, Clone, Copy)]
pub struct NearestStation<'a, T> {
    pub candidate: &'a T,
    pub distance_km: f64,
}

impl<T: AsRef<Station>> NearestStation<'_, T> {
    #[must_use]
    pub fn station(&self) -> &Station {
        self.candidate.as_ref()
    }
}

/// Find the station closest to `query` among `candidates`.
///
/// Returns `None` when the list is empty or the closest station lies
/// farther than `max_radius_km`. Equidistant stations resolve to the
/// lexicographically smaller identifier so results are reproducible.
pub fn resolve<'a, T: AsRef<Station>>(
    candidates: &'a [T],
    query: &Coordinates,
    max_radius_km: f64,
) -> Option<NearestStation<'a, T>> {
    let mut best: Option<NearestStation<'a, T>> = None;

    for candidate in candidates {
        let station = candidate.as_ref();
        let distance_km = query.distance_km(&station.coordinates());
        if distance_km.is_nan() {
            continue;
        }

        let replace = match &best {
            None => true,
            Some(current) => {
                let delta = distance_km - current.distance_km;
                if delta.abs() <= DISTANCE_EPSILON_KM {
                    station.id < current.station().id
                } else {
                    delta < 0.0
                }
            }
        };

        if replace {
            best = Some(NearestStation {
                candidate,
                distance_km,
            });
        }
    }

    best.filter(|nearest| nearest.distance_km <= max_radius_km)
}
