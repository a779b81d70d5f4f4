//! Observer API server for QuakeWatch.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`GET /health`** -- liveness probe
//! - **`GET /data`** -- the cached earthquake snapshot, optionally filtered
//!   to a radius around a caller-supplied location
//! - **`WebSocket` endpoint** (`/ws`) pushing the full snapshot to every
//!   subscriber on a fixed interval
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! The observer only reads from the [`SnapshotStore`] that the poller
//! writes. Each request or push loads the current snapshot once and works
//! on that immutable copy, so it never blocks the poller and never sees a
//! half-written cycle.
//!
//! [`SnapshotStore`]: quakewatch_core::snapshot::SnapshotStore

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{ObserverHandle, StartupError, spawn_observer};
pub use state::{AppState, ObserverSettings, SubscriberRegistry};
