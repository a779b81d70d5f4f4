//! Upstream earthquake feed client.
//!
//! The feed is a GeoJSON feature collection in the USGS summary format.
//! Each feature carries `properties.place`, `properties.mag`,
//! `properties.time` and `geometry.coordinates = [lon, lat, depth]`.
//!
//! [`FeedFetcher`] performs one bounded HTTP request per call and returns a
//! typed [`FetchError`] on failure. Callers decide how to degrade; the
//! poller logs the error and publishes an empty snapshot.

use std::future::Future;
use std::time::Duration;

use quakewatch_types::RawEvent;
use serde::Deserialize;
use tracing::debug;

use crate::config::FeedConfig;

/// Errors that can occur while fetching or decoding the feed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The request did not complete within the configured bound.
    #[error("feed request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, TLS, or other transport-level failure.
    #[error("feed request failed: {0}")]
    Transport(String),

    /// The feed answered with a non-success status code.
    #[error("feed returned HTTP {0}")]
    Status(u16),

    /// The body was not a valid feature collection.
    #[error("malformed feed payload: {0}")]
    Decode(String),
}

/// A source of raw earthquake events.
///
/// The poller is generic over this trait so tests can drive it with a
/// canned source instead of the network.
pub trait EventSource: Send + Sync {
    /// Fetch the current batch of events.
    fn fetch(&self) -> impl Future<Output = Result<Vec<RawEvent>, FetchError>> + Send;
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Properties>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(default)]
    place: Option<String>,
    #[serde(default)]
    mag: Option<f64>,
    #[serde(default)]
    time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Vec<Option<f64>>,
}

impl From<Feature> for RawEvent {
    fn from(feature: Feature) -> Self {
        let coords = feature.geometry.map(|g| g.coordinates).unwrap_or_default();
        let coord = |i: usize| coords.get(i).copied().flatten();
        let properties = feature.properties.unwrap_or_default();

        Self {
            place: properties.place,
            magnitude: properties.mag,
            time: properties.time,
            longitude: coord(0),
            latitude: coord(1),
            depth: coord(2),
        }
    }
}

/// Decode a feature collection body into raw events.
///
/// Every well-formed feature is returned, in feed order. Missing or `null`
/// fields map to `None`. A feature whose fields have the wrong type is
/// skipped without affecting the rest of the batch.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] if the body is not JSON or lacks a
/// `features` array.
pub fn parse_feed(body: &str) -> Result<Vec<RawEvent>, FetchError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let total = collection.features.len();
    let events: Vec<RawEvent> = collection
        .features
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Feature>(value) {
            Ok(feature) => Some(RawEvent::from(feature)),
            Err(e) => {
                debug!(error = %e, "Skipping malformed feature");
                None
            }
        })
        .collect();

    let skipped = total.saturating_sub(events.len());
    if skipped > 0 {
        debug!(skipped, total, "Skipped malformed features in feed");
    }
    Ok(events)
}

// ---------------------------------------------------------------------------
// HTTP fetcher
// ---------------------------------------------------------------------------

/// HTTP client for the configured feed URL.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl FeedFetcher {
    /// Build a fetcher whose requests are bounded by `config.timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the TLS backend cannot initialize.
    pub fn new(config: &FeedConfig) -> Result<Self, FetchError> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quakewatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            timeout,
        })
    }

    /// The URL this fetcher polls.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify_error(&self, e: &reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

impl EventSource for FeedFetcher {
    async fn fetch(&self) -> Result<Vec<RawEvent>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.classify_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| self.classify_error(&e))?;
        parse_feed(&body)
    }
}
