//! Core event structs for QuakeWatch.
//!
//! [`RawEvent`] mirrors a single feature of the upstream feed with every
//! field optional. [`ProcessedEvent`] is what the API serves: magnitude and
//! coordinates are guaranteed present, and the risk label is attached.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::RiskLevel;

// ---------------------------------------------------------------------------
// RawEvent
// ---------------------------------------------------------------------------

/// An earthquake as reported by the upstream feed, before filtering.
///
/// Fields missing in the source document are `None`, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Human-readable location description (e.g. `"10 km SSW of Ridgecrest, CA"`).
    pub place: Option<String>,
    /// Reported magnitude.
    pub magnitude: Option<f64>,
    /// Origin time in epoch milliseconds.
    pub time: Option<i64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Depth in kilometres.
    pub depth: Option<f64>,
}

// ---------------------------------------------------------------------------
// ProcessedEvent
// ---------------------------------------------------------------------------

/// A filtered, risk-annotated earthquake held in the snapshot.
///
/// `distance_km` is only populated when a query supplied a reference
/// location, and is omitted from the JSON otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProcessedEvent {
    /// Human-readable location description.
    pub place: Option<String>,
    /// Reported magnitude.
    pub magnitude: f64,
    /// Depth in kilometres.
    pub depth: Option<f64>,
    /// Risk label derived from the magnitude.
    pub risk: RiskLevel,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Origin time in epoch milliseconds.
    #[ts(type = "number | null")]
    pub time: Option<i64>,
    /// Great-circle distance from the query location, rounded to 0.01 km.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub distance_km: Option<f64>,
}

impl ProcessedEvent {
    /// Return a copy of this event annotated with a query distance.
    #[must_use]
    pub fn with_distance(mut self, distance_km: f64) -> Self {
        self.distance_km = Some(distance_km);
        self
    }
}

// ---------------------------------------------------------------------------
// QueryResponse
// ---------------------------------------------------------------------------

/// Body of `GET /data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QueryResponse {
    /// Number of events in `events`.
    pub count: usize,
    /// Matching events, most recent first.
    pub events: Vec<ProcessedEvent>,
}

impl QueryResponse {
    /// Build a response, deriving `count` from the event list.
    pub fn new(events: Vec<ProcessedEvent>) -> Self {
        Self {
            count: events.len(),
            events,
        }
    }
}
