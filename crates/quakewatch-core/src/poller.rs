//! Background poll loop: fetch, filter, annotate, publish, sleep.
//!
//! The [`Poller`] is the only writer of the [`SnapshotStore`]. Every cycle
//! replaces the snapshot wholesale. A failed fetch is logged and treated
//! as "no events this cycle", so the store is cleared rather than keeping
//! stale data.
//!
//! The loop checks its [`CancellationToken`] at both suspension points
//! (the network fetch and the inter-cycle sleep) and returns a
//! [`PollerSummary`] once cancelled.

use std::time::Duration;

use quakewatch_types::{ProcessedEvent, RawEvent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::feed::{EventSource, FetchError};
use crate::risk::classify;
use crate::snapshot::SnapshotStore;

/// Result of a poller run, returned after cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSummary {
    /// Number of completed poll cycles.
    pub cycles: u64,
}

/// Convert a raw event into a processed one.
///
/// Returns `None` when magnitude, latitude or longitude is missing.
pub fn process_event(raw: RawEvent) -> Option<ProcessedEvent> {
    let (Some(magnitude), Some(latitude), Some(longitude)) =
        (raw.magnitude, raw.latitude, raw.longitude)
    else {
        return None;
    };

    Some(ProcessedEvent {
        place: raw.place,
        magnitude,
        depth: raw.depth,
        risk: classify(Some(magnitude)),
        latitude,
        longitude,
        time: raw.time,
        distance_km: None,
    })
}

/// Filter and annotate a fetched batch, preserving feed order.
pub fn process_events(raw: Vec<RawEvent>) -> Vec<ProcessedEvent> {
    raw.into_iter().filter_map(process_event).collect()
}

/// Periodic feed poller.
#[derive(Debug)]
pub struct Poller<S> {
    source: S,
    store: SnapshotStore,
    interval: Duration,
    cycles: u64,
}

impl<S: EventSource> Poller<S> {
    /// Create a poller that publishes into `store` every `interval`.
    pub fn new(source: S, store: SnapshotStore, interval: Duration) -> Self {
        Self {
            source,
            store,
            interval,
            cycles: 0,
        }
    }

    /// Number of cycles completed so far.
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run a single fetch-process-publish cycle.
    ///
    /// Returns the number of events published.
    pub async fn poll_once(&mut self) -> usize {
        let fetched = self.source.fetch().await;
        self.publish(fetched).await
    }

    /// Run cycles until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) -> PollerSummary {
        info!(
            interval_secs = self.interval.as_secs(),
            "Poller starting"
        );

        loop {
            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.source.fetch() => result,
            };
            self.publish(fetched).await;

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(cycles = self.cycles, "Poller stopped");
        PollerSummary {
            cycles: self.cycles,
        }
    }

    async fn publish(&mut self, fetched: Result<Vec<RawEvent>, FetchError>) -> usize {
        self.cycles = self.cycles.saturating_add(1);
        let cycle = self.cycles;

        let raw = fetched.unwrap_or_else(|e| {
            warn!(cycle, error = %e, "Feed fetch failed, publishing empty snapshot");
            Vec::new()
        });

        let fetched_count = raw.len();
        let processed = process_events(raw);
        let dropped = fetched_count.saturating_sub(processed.len());
        if dropped > 0 {
            debug!(cycle, dropped, "Dropped events missing magnitude or coordinates");
        }

        let published = self.store.publish(processed, cycle).await;
        info!(cycle, events = published, "Updated earthquake snapshot");
        published
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use quakewatch_types::RiskLevel;

    use super::*;

    /// Replays scripted fetch results, then returns empty batches.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Vec<RawEvent>, FetchError>>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Vec<RawEvent>, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    impl EventSource for ScriptedSource {
        async fn fetch(&self) -> Result<Vec<RawEvent>, FetchError> {
            self.script
                .lock()
                .ok()
                .and_then(|mut q| q.pop_front())
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn raw(magnitude: Option<f64>, latitude: Option<f64>, longitude: Option<f64>) -> RawEvent {
        RawEvent {
            place: Some(String::from("Test Place")),
            magnitude,
            time: Some(1_700_000_000_000),
            longitude,
            latitude,
            depth: Some(8.0),
        }
    }

    #[test]
    fn missing_latitude_is_dropped() {
        assert!(process_event(raw(Some(5.0), None, Some(10.0))).is_none());
        assert!(process_event(raw(None, Some(1.0), Some(10.0))).is_none());
        assert!(process_event(raw(Some(5.0), Some(1.0), None)).is_none());
    }

    #[test]
    fn complete_event_is_annotated() {
        let processed = process_event(raw(Some(5.0), Some(1.0), Some(10.0)));
        assert!(processed.is_some(), "event with all fields present was dropped");
        let Some(event) = processed else { return };
        assert_eq!(event.risk, RiskLevel::Medium);
        assert!(event.distance_km.is_none());
        assert_eq!(event.place.as_deref(), Some("Test Place"));
        assert_eq!(event.depth, Some(8.0));
    }

    #[test]
    fn batch_keeps_order_and_drops_incomplete() {
        let batch = vec![
            raw(Some(6.5), Some(1.0), Some(1.0)),
            raw(Some(5.0), None, Some(1.0)),
            raw(Some(3.0), Some(2.0), Some(2.0)),
        ];
        let processed = process_events(batch);
        let risks: Vec<RiskLevel> = processed.iter().map(|e| e.risk).collect();
        assert_eq!(risks, vec![RiskLevel::High, RiskLevel::Low]);
    }

    #[tokio::test]
    async fn failed_fetch_publishes_empty_snapshot() {
        let store = SnapshotStore::new();
        let source = ScriptedSource::new(vec![
            Ok(vec![raw(Some(5.0), Some(1.0), Some(1.0))]),
            Err(FetchError::Status(503)),
        ]);
        let mut poller = Poller::new(source, store.clone(), Duration::from_secs(60));

        assert_eq!(poller.poll_once().await, 1);
        assert_eq!(store.load().await.len(), 1);

        // The previous snapshot is not retained on failure.
        assert_eq!(poller.poll_once().await, 0);
        let snap = store.load().await;
        assert!(snap.is_empty());
        assert_eq!(snap.cycle, 2);
        assert_eq!(poller.cycles(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_polls_every_interval_until_cancelled() {
        let store = SnapshotStore::new();
        let source = ScriptedSource::new(vec![
            Ok(vec![raw(Some(4.0), Some(1.0), Some(1.0))]),
            Ok(vec![
                raw(Some(4.0), Some(1.0), Some(1.0)),
                raw(Some(7.0), Some(1.0), Some(1.0)),
            ]),
        ]);
        let poller = Poller::new(source, store.clone(), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poller.run(cancel.clone()));

        // Cycles at t = 0s, 60s and 120s.
        tokio::time::sleep(Duration::from_secs(150)).await;
        cancel.cancel();

        let summary = handle.await.ok();
        assert_eq!(summary, Some(PollerSummary { cycles: 3 }));
        // Third cycle ran past the script and published nothing.
        let snap = store.load().await;
        assert_eq!(snap.cycle, 3);
        assert!(snap.is_empty());
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_no_cycles() {
        let store = SnapshotStore::new();
        let poller = Poller::new(
            ScriptedSource::new(Vec::new()),
            store.clone(),
            Duration::from_secs(60),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = poller.run(cancel).await;
        assert_eq!(summary.cycles, 0);
        assert_eq!(store.load().await.cycle, 0);
    }
}
