//! `WebSocket` handler for periodic snapshot streaming.
//!
//! Clients connect to `GET /ws` and receive the full current snapshot as a
//! JSON array of events immediately, then again every push interval. Each
//! subscriber runs its own loop on its own task, so a slow or broken
//! client only affects itself.
//!
//! A failed send means the client is gone: the subscriber is deregistered
//! quietly. A snapshot that cannot be serialized is an internal fault and
//! is logged as an error. Sends race the shutdown token, so a client that
//! stops reading cannot hold up server shutdown.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, Stream, StreamExt};
use quakewatch_core::snapshot::Snapshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::error::ObserverError;
use crate::state::AppState;

/// Floor applied to the configured push interval.
pub const MIN_PUSH_INTERVAL: Duration = Duration::from_millis(10);

/// Why a subscriber loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The client sent a close frame or the connection ended.
    ClientClosed,
    /// Sending to the client failed.
    SendFailed,
    /// The inbound side reported a transport error.
    ReceiveFailed,
    /// The server is shutting down.
    Shutdown,
    /// The snapshot could not be serialized.
    Internal,
}

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming snapshots.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let (tx, rx) = socket.split();
    stream_snapshots(tx, rx, &state).await;
}

/// Encode a snapshot as the push payload: a JSON array of events.
///
/// # Errors
///
/// Returns [`ObserverError::Serialization`] if encoding fails.
pub fn snapshot_payload(snapshot: &Snapshot) -> Result<String, ObserverError> {
    Ok(serde_json::to_string(&snapshot.events)?)
}

/// Drive one subscriber until it disconnects or the server shuts down.
///
/// Generic over the transport halves so the loop can run against an
/// in-memory channel in tests.
pub async fn stream_snapshots<Tx, Rx, E>(mut tx: Tx, mut rx: Rx, state: &AppState) -> StreamEnd
where
    Tx: Sink<Message> + Unpin,
    Tx::Error: Display,
    Rx: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let subscription = state.subscribers.register();
    let id = subscription.id();
    debug!(
        subscriber = %id,
        subscribers = state.subscribers.len(),
        "WebSocket subscriber connected"
    );

    let period = state.settings.push_interval.max(MIN_PUSH_INTERVAL);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let end = loop {
        tokio::select! {
            () = state.shutdown.cancelled() => break StreamEnd::Shutdown,

            _ = ticker.tick() => {
                let snapshot = state.store.load().await;
                let payload = match snapshot_payload(&snapshot) {
                    Ok(p) => p,
                    Err(e) => {
                        error!(subscriber = %id, error = %e, "Failed to encode snapshot");
                        break StreamEnd::Internal;
                    }
                };
                let sent = tokio::select! {
                    biased;
                    () = state.shutdown.cancelled() => break StreamEnd::Shutdown,
                    sent = tx.send(Message::Text(payload.into())) => sent,
                };
                if let Err(e) = sent {
                    debug!(subscriber = %id, error = %e, "Subscriber gone (send failed)");
                    break StreamEnd::SendFailed;
                }
            }

            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break StreamEnd::ClientClosed,
                    Some(Ok(Message::Ping(data))) => {
                        let sent = tokio::select! {
                            biased;
                            () = state.shutdown.cancelled() => break StreamEnd::Shutdown,
                            sent = tx.send(Message::Pong(data)) => sent,
                        };
                        if let Err(e) = sent {
                            debug!(subscriber = %id, error = %e, "Subscriber gone (pong failed)");
                            break StreamEnd::SendFailed;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(subscriber = %id, error = %e, "WebSocket receive error");
                        break StreamEnd::ReceiveFailed;
                    }
                    // Text or binary from the client carries no meaning here.
                    Some(Ok(_)) => {}
                }
            }
        }
    };

    drop(subscription);
    debug!(
        subscriber = %id,
        reason = ?end,
        subscribers = state.subscribers.len(),
        "WebSocket subscriber disconnected"
    );
    end
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::convert::Infallible;
    use std::time::Duration;

    use futures::channel::mpsc;
    use quakewatch_core::snapshot::SnapshotStore;
    use quakewatch_types::{ProcessedEvent, RiskLevel};

    use super::*;
    use crate::state::ObserverSettings;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(
            SnapshotStore::new(),
            ObserverSettings {
                default_radius_km: 300.0,
                push_interval: Duration::from_secs(2),
            },
        ))
    }

    fn event(time: i64) -> ProcessedEvent {
        ProcessedEvent {
            place: Some(String::from("Nowhere")),
            magnitude: 6.1,
            depth: None,
            risk: RiskLevel::High,
            latitude: 1.0,
            longitude: 2.0,
            time: Some(time),
            distance_km: None,
        }
    }

    fn text(msg: Option<Message>) -> String {
        match msg {
            Some(Message::Text(t)) => t.as_str().to_owned(),
            other => format!("unexpected: {other:?}"),
        }
    }

    /// Inbound side that never yields, like a silent client.
    fn silent() -> futures::stream::Pending<Result<Message, Infallible>> {
        futures::stream::pending()
    }

    #[tokio::test(start_paused = true)]
    async fn pushes_snapshot_immediately_and_every_interval() {
        let state = test_state();
        state.store.publish(vec![event(1)], 1).await;

        let (tx, mut out) = mpsc::unbounded::<Message>();
        let task_state = Arc::clone(&state);
        let task = tokio::spawn(async move { stream_snapshots(tx, silent(), &task_state).await });

        let first: serde_json::Value = serde_json::from_str(&text(out.next().await)).unwrap();
        assert_eq!(first.as_array().map(Vec::len), Some(1));
        assert_eq!(state.subscribers.len(), 1);

        state.store.publish(vec![event(2), event(3)], 2).await;
        let second: serde_json::Value = serde_json::from_str(&text(out.next().await)).unwrap();
        assert_eq!(second.as_array().map(Vec::len), Some(2));

        state.shutdown.cancel();
        assert_eq!(task.await.ok(), Some(StreamEnd::Shutdown));
        assert!(state.subscribers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_snapshot_is_an_empty_array() {
        let state = test_state();
        let (tx, mut out) = mpsc::unbounded::<Message>();
        let task_state = Arc::clone(&state);
        let task = tokio::spawn(async move { stream_snapshots(tx, silent(), &task_state).await });

        assert_eq!(text(out.next().await), "[]");
        state.shutdown.cancel();
        assert!(task.await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnected_subscriber_is_removed_without_affecting_others() {
        let state = test_state();

        let (tx_a, mut out_a) = mpsc::unbounded::<Message>();
        let (tx_b, out_b) = mpsc::unbounded::<Message>();

        let state_a = Arc::clone(&state);
        let task_a = tokio::spawn(async move { stream_snapshots(tx_a, silent(), &state_a).await });
        let state_b = Arc::clone(&state);
        let task_b = tokio::spawn(async move { stream_snapshots(tx_b, silent(), &state_b).await });

        // Both receive the initial push.
        assert!(out_a.next().await.is_some());
        assert_eq!(state.subscribers.len(), 2);

        // B goes away; its next push fails within one interval.
        drop(out_b);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(task_b.await.ok(), Some(StreamEnd::SendFailed));
        assert_eq!(state.subscribers.len(), 1);

        // A keeps receiving.
        assert!(out_a.next().await.is_some());
        assert!(!task_a.is_finished());

        state.shutdown.cancel();
        assert_eq!(task_a.await.ok(), Some(StreamEnd::Shutdown));
        assert!(state.subscribers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_push_interval_is_clamped_instead_of_panicking() {
        let state = Arc::new(AppState::new(
            SnapshotStore::new(),
            ObserverSettings {
                default_radius_km: 300.0,
                push_interval: Duration::ZERO,
            },
        ));
        let (tx, mut out) = mpsc::unbounded::<Message>();
        let task_state = Arc::clone(&state);
        let task = tokio::spawn(async move { stream_snapshots(tx, silent(), &task_state).await });

        assert_eq!(text(out.next().await), "[]");
        assert_eq!(text(out.next().await), "[]");

        state.shutdown.cancel();
        assert_eq!(task.await.ok(), Some(StreamEnd::Shutdown));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_client_does_not_block_shutdown() {
        let state = test_state();
        // Zero-capacity channel that is never drained: sends park forever.
        let (tx, _out) = mpsc::channel::<Message>(0);
        let task_state = Arc::clone(&state);
        let task = tokio::spawn(async move { stream_snapshots(tx, silent(), &task_state).await });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!task.is_finished());

        state.shutdown.cancel();
        let joined = tokio::time::timeout(Duration::from_secs(1), task).await;
        assert!(matches!(joined, Ok(Ok(StreamEnd::Shutdown))));
        assert!(state.subscribers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn close_frame_ends_the_stream() {
        let state = test_state();
        let (tx, _out) = mpsc::unbounded::<Message>();
        let inbound = futures::stream::iter(vec![Ok::<_, Infallible>(Message::Close(None))]);

        let end = stream_snapshots(tx, inbound, &state).await;
        assert_eq!(end, StreamEnd::ClientClosed);
        assert!(state.subscribers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ping_is_answered_with_pong() {
        let state = test_state();
        let (tx, mut out) = mpsc::unbounded::<Message>();
        let (mut inbound_tx, inbound) = mpsc::unbounded::<Result<Message, Infallible>>();

        let task_state = Arc::clone(&state);
        let task = tokio::spawn(async move { stream_snapshots(tx, inbound, &task_state).await });

        // Initial snapshot push.
        assert!(matches!(out.next().await, Some(Message::Text(_))));

        inbound_tx
            .send(Ok(Message::Ping(vec![7_u8].into())))
            .await
            .unwrap();
        assert!(matches!(out.next().await, Some(Message::Pong(_))));

        drop(inbound_tx);
        assert_eq!(task.await.ok(), Some(StreamEnd::ClientClosed));
    }
}
