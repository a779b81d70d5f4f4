//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds a handle to the [`SnapshotStore`] written by the
//! poller, the registry of connected `WebSocket` subscribers, the request
//! defaults taken from configuration, and the shutdown token that ends
//! every subscriber loop.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use quakewatch_core::config::QuakeWatchConfig;
use quakewatch_core::snapshot::SnapshotStore;
use quakewatch_types::SubscriberId;
use tokio_util::sync::CancellationToken;

/// Request defaults derived from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverSettings {
    /// Radius applied to `/data` location queries that omit `radius`.
    pub default_radius_km: f64,
    /// Interval between snapshot pushes to each subscriber.
    pub push_interval: Duration,
}

impl Default for ObserverSettings {
    fn default() -> Self {
        Self::from(&QuakeWatchConfig::default())
    }
}

impl From<&QuakeWatchConfig> for ObserverSettings {
    fn from(config: &QuakeWatchConfig) -> Self {
        Self {
            default_radius_km: config.alerts.radius_km,
            push_interval: config.observer.push_interval(),
        }
    }
}

/// Set of currently connected `WebSocket` subscribers.
///
/// Uses a synchronous mutex so that [`Subscription`] can deregister from
/// its `Drop` implementation. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<BTreeMap<SubscriberId, DateTime<Utc>>>,
}

impl SubscriberRegistry {
    /// Register a new subscriber. It stays registered until the returned
    /// [`Subscription`] is dropped.
    pub fn register(&self) -> Subscription<'_> {
        let id = SubscriberId::new();
        self.lock().insert(id, Utc::now());
        Subscription { id, registry: self }
    }

    /// Number of connected subscribers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no subscribers are connected.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether `id` is currently registered.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.lock().contains_key(&id)
    }

    fn deregister(&self, id: SubscriberId) {
        self.lock().remove(&id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<SubscriberId, DateTime<Utc>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration handle for one subscriber; deregisters on drop.
#[derive(Debug)]
pub struct Subscription<'a> {
    id: SubscriberId,
    registry: &'a SubscriberRegistry,
}

impl Subscription<'_> {
    /// The subscriber's identifier.
    pub const fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug)]
pub struct AppState {
    /// The snapshot store written by the poller.
    pub store: SnapshotStore,
    /// Connected `WebSocket` subscribers.
    pub subscribers: SubscriberRegistry,
    /// Request defaults.
    pub settings: ObserverSettings,
    /// Cancelled on process shutdown to end subscriber loops.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create application state over an existing store.
    pub fn new(store: SnapshotStore, settings: ObserverSettings) -> Self {
        Self {
            store,
            subscribers: SubscriberRegistry::default(),
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    /// Attach a shutdown token shared with the rest of the process.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(SnapshotStore::new(), ObserverSettings::default())
    }
}
