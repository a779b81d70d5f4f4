//! Shared type definitions for QuakeWatch.
//!
//! This crate is the single source of truth for the event types used
//! across the workspace. Types flow downstream to `TypeScript` via `ts-rs`
//! for the map dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers (subscriber identifiers)
//! - [`enums`] -- [`RiskLevel`]
//! - [`structs`] -- Raw and processed earthquake events, query responses

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::RiskLevel;
pub use ids::SubscriberId;
pub use structs::{ProcessedEvent, QueryResponse, RawEvent};
