//! REST API endpoint handlers for the Observer server.
//!
//! All handlers read from the shared [`SnapshotStore`] via [`AppState`].
//! A handler loads the current snapshot once and works on that immutable
//! copy, so a poll cycle landing mid-request cannot change the answer.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/data` | Cached events, optionally filtered by proximity |
//!
//! [`SnapshotStore`]: quakewatch_core::snapshot::SnapshotStore

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use quakewatch_core::query::{Proximity, query};
use quakewatch_types::QueryResponse;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /data` endpoint.
#[derive(Debug, Default, serde::Deserialize)]
pub struct DataQuery {
    /// Reference latitude in degrees.
    pub lat: Option<f64>,
    /// Reference longitude in degrees.
    pub lon: Option<f64>,
    /// Search radius in kilometres (default: configured alert radius).
    pub radius: Option<f64>,
}

impl DataQuery {
    /// Reject values that parse as numbers but make no sense as inputs.
    fn validate(&self) -> Result<(), ObserverError> {
        for (name, value) in [("lat", self.lat), ("lon", self.lon), ("radius", self.radius)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(ObserverError::InvalidQuery(format!(
                    "{name} must be a finite number"
                )));
            }
        }
        if self.radius.is_some_and(|r| r < 0.0) {
            return Err(ObserverError::InvalidQuery(String::from(
                "radius must not be negative",
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe. Always `200 {"status": "running"}`.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "running" }))
}

// ---------------------------------------------------------------------------
// GET /data
// ---------------------------------------------------------------------------

/// Return cached events, most recent first.
///
/// # Query Parameters
///
/// - `lat`, `lon`: reference point; both must be present to filter
/// - `radius`: kilometres, defaults to the configured alert radius
///
/// When the poller has never succeeded this returns
/// `{"count": 0, "events": []}` rather than an error.
pub async fn get_data(
    State(state): State<Arc<AppState>>,
    params: Result<Query<DataQuery>, QueryRejection>,
) -> Result<Json<QueryResponse>, ObserverError> {
    let Query(params) = params.map_err(|e| ObserverError::InvalidQuery(e.body_text()))?;
    params.validate()?;

    let radius_km = params.radius.unwrap_or(state.settings.default_radius_km);
    let proximity = Proximity::from_parts(params.lat, params.lon, radius_km);

    let snapshot = state.store.load().await;
    Ok(Json(query(&snapshot, proximity)))
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing poller status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.store.load().await;
    let event_count = snapshot.len();
    let cycle = snapshot.cycle;
    let updated = snapshot
        .updated_at
        .map_or_else(|| String::from("never"), |t| t.to_rfc3339());
    let subscribers = state.subscribers.len();
    let radius = state.settings.default_radius_km;

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>QuakeWatch</title>
    <style>
        body {{ background: #0d1117; color: #c9d1d9; font-family: monospace; padding: 2rem; }}
        h1 {{ color: #58a6ff; }}
        a {{ color: #58a6ff; }}
        td {{ padding: 0.2rem 1rem 0.2rem 0; }}
    </style>
</head>
<body>
    <h1>QuakeWatch</h1>
    <table>
        <tr><td>Poll cycle</td><td>{cycle}</td></tr>
        <tr><td>Last update</td><td>{updated}</td></tr>
        <tr><td>Cached events</td><td>{event_count}</td></tr>
        <tr><td>Subscribers</td><td>{subscribers}</td></tr>
        <tr><td>Default radius</td><td>{radius} km</td></tr>
    </table>
    <h2>API</h2>
    <ul>
        <li><a href="/health">/health</a></li>
        <li><a href="/data">/data</a> (?lat=&amp;lon=&amp;radius=)</li>
        <li><code>ws://host:port/ws</code> -- snapshot stream</li>
    </ul>
</body>
</html>"#
    ))
}
