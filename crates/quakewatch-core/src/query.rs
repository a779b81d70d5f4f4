//! Read-side filtering of a snapshot for `GET /data`.

use std::cmp::Reverse;

use quakewatch_types::{ProcessedEvent, QueryResponse};

use crate::geo::{distance_km, round_km};
use crate::snapshot::Snapshot;

/// Optional reference location for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proximity {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Maximum distance in kilometres (inclusive).
    pub radius_km: f64,
}

impl Proximity {
    /// Build a proximity filter when both coordinates are present.
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>, radius_km: f64) -> Option<Self> {
        Some(Self {
            lat: lat?,
            lon: lon?,
            radius_km,
        })
    }
}

/// Filter and sort the events of `snapshot`.
///
/// With a [`Proximity`], only events within `radius_km` are kept and each
/// carries its rounded `distance_km`. Without one, every event is returned
/// unannotated. Either way the result is ordered most recent first, with
/// events lacking a timestamp last. The snapshot itself is never modified.
pub fn query(snapshot: &Snapshot, proximity: Option<Proximity>) -> QueryResponse {
    let mut events: Vec<ProcessedEvent> = match proximity {
        Some(p) => snapshot
            .events
            .iter()
            .filter_map(|event| {
                let d = distance_km(p.lat, p.lon, event.latitude, event.longitude);
                (d <= p.radius_km).then(|| event.clone().with_distance(round_km(d)))
            })
            .collect(),
        None => snapshot.events.clone(),
    };

    // `None < Some(_)`, so reversing puts untimed events at the end.
    events.sort_by_key(|event| Reverse(event.time));

    QueryResponse::new(events)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::indexing_slicing)]

    use quakewatch_types::RiskLevel;

    use super::*;

    fn event(place: &str, lat: f64, lon: f64, time: Option<i64>) -> ProcessedEvent {
        ProcessedEvent {
            place: Some(place.to_owned()),
            magnitude: 4.0,
            depth: Some(10.0),
            risk: RiskLevel::Low,
            latitude: lat,
            longitude: lon,
            time,
            distance_km: None,
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            events: vec![
                event("Tokyo", 35.68, 139.69, Some(1_000)),
                event("Santiago", -33.45, -70.67, Some(3_000)),
                event("Untimed", 35.0, 139.0, None),
                event("Osaka", 34.69, 135.50, Some(2_000)),
            ],
            cycle: 1,
            updated_at: None,
        }
    }

    fn places(response: &QueryResponse) -> Vec<&str> {
        response
            .events
            .iter()
            .filter_map(|e| e.place.as_deref())
            .collect()
    }

    #[test]
    fn without_location_returns_everything_newest_first() {
        let response = query(&snapshot(), None);
        assert_eq!(response.count, 4);
        assert_eq!(places(&response), vec!["Santiago", "Osaka", "Tokyo", "Untimed"]);
        assert!(response.events.iter().all(|e| e.distance_km.is_none()));
    }

    #[test]
    fn partial_location_is_ignored() {
        assert!(Proximity::from_parts(Some(35.0), None, 300.0).is_none());
        assert!(Proximity::from_parts(None, Some(139.0), 300.0).is_none());
    }

    #[test]
    fn radius_filters_and_annotates() {
        // Around Tokyo: Tokyo, Osaka (~400 km) and the untimed event are close.
        let near_tokyo = Proximity::from_parts(Some(35.68), Some(139.69), 500.0);
        let response = query(&snapshot(), near_tokyo);

        assert_eq!(response.count, 3);
        assert_eq!(places(&response), vec!["Osaka", "Tokyo", "Untimed"]);
        assert!(response.events.iter().all(|e| e.distance_km.is_some()));

        let tokyo = &response.events[1];
        assert!(tokyo.distance_km.is_some_and(|d| d.abs() < 0.01));
    }

    #[test]
    fn zero_radius_far_from_origin_is_empty() {
        let response = query(&snapshot(), Proximity::from_parts(Some(0.0), Some(0.0), 0.0));
        assert_eq!(response.count, 0);
        assert!(response.events.is_empty());
    }

    #[test]
    fn radius_is_inclusive() {
        let snap = Snapshot {
            events: vec![event("Here", 10.0, 10.0, Some(1))],
            cycle: 1,
            updated_at: None,
        };
        let response = query(&snap, Proximity::from_parts(Some(10.0), Some(10.0), 0.0));
        assert_eq!(response.count, 1);
    }

    #[test]
    fn snapshot_is_not_modified() {
        let snap = snapshot();
        let before = snap.clone();
        let _ = query(&snap, Proximity::from_parts(Some(35.68), Some(139.69), 500.0));
        assert_eq!(snap, before);
    }
}
