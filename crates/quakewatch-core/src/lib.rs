//! Feed polling, classification, and the shared snapshot for QuakeWatch.
//!
//! This crate owns everything between the upstream earthquake feed and the
//! HTTP layer: one background poller writes a [`Snapshot`], any number of
//! readers query it.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `quakewatch-config.yaml` into
//!   strongly-typed structs, with environment overrides.
//! - [`feed`] -- [`EventSource`] trait and the HTTP [`FeedFetcher`].
//! - [`geo`] -- Haversine distance.
//! - [`poller`] -- The cancellable fetch-process-publish loop.
//! - [`query`] -- Proximity filtering and recency ordering for reads.
//! - [`risk`] -- Magnitude to [`RiskLevel`] classification.
//! - [`snapshot`] -- [`SnapshotStore`], the single shared mutable state.
//!
//! [`EventSource`]: feed::EventSource
//! [`FeedFetcher`]: feed::FeedFetcher
//! [`Snapshot`]: snapshot::Snapshot
//! [`SnapshotStore`]: snapshot::SnapshotStore
//! [`RiskLevel`]: quakewatch_types::RiskLevel

pub mod config;
pub mod feed;
pub mod geo;
pub mod poller;
pub mod query;
pub mod risk;
pub mod snapshot;
