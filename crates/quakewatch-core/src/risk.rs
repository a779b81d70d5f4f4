//! Magnitude-based risk classification.

use quakewatch_types::RiskLevel;

/// Magnitude at or above which an event is [`RiskLevel::High`].
pub const HIGH_THRESHOLD: f64 = 6.0;

/// Magnitude at or above which an event is at least [`RiskLevel::Medium`].
pub const MEDIUM_THRESHOLD: f64 = 4.5;

/// Map a magnitude to its risk label.
///
/// Thresholds are checked from the top down. A `NaN` magnitude matches no
/// threshold and falls through to [`RiskLevel::Low`].
pub fn classify(magnitude: Option<f64>) -> RiskLevel {
    match magnitude {
        None => RiskLevel::Unknown,
        Some(m) if m >= HIGH_THRESHOLD => RiskLevel::High,
        Some(m) if m >= MEDIUM_THRESHOLD => RiskLevel::Medium,
        Some(_) => RiskLevel::Low,
    }
}
