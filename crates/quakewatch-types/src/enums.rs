//! Enumeration types for QuakeWatch.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Risk label derived solely from an event's magnitude.
///
/// Serialized as the exact strings `"Low"`, `"Medium"`, `"High"` and
/// `"Unknown"`; the dashboard keys its badge colors on these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum RiskLevel {
    /// Magnitude below 4.5.
    Low,
    /// Magnitude in `[4.5, 6.0)`.
    Medium,
    /// Magnitude of 6.0 or above.
    High,
    /// No magnitude reported.
    Unknown,
}

impl RiskLevel {
    /// The wire label for this risk level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Unknown => "Unknown",
        }
    }
}

impl core::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_plain_label() {
        let json = serde_json::to_string(&RiskLevel::Medium).unwrap_or_default();
        assert_eq!(json, "\"Medium\"");

        let parsed: Result<RiskLevel, _> = serde_json::from_str("\"Unknown\"");
        assert!(matches!(parsed, Ok(RiskLevel::Unknown)));
    }

    #[test]
    fn display_matches_wire_label() {
        for level in [
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::Unknown,
        ] {
            let json = serde_json::to_string(&level).unwrap_or_default();
            assert_eq!(json, format!("\"{level}\""));
        }
    }
}
