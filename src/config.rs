//! Timing configuration.
//!
//! Built once by the embedding service and passed into the request-level
//! entry points. The timing engine never reads configuration on its own.

use std::env;

use serde::{Deserialize, Serialize};

/// How checkpoints inside a gate pair must be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "snake_case")]
pub enum CheckpointOrder {
    /// Each checkpoint must be hit somewhere between start and end.
    #[default]
    Unordered,
    /// Checkpoints must be hit in list order, each after the previous one.
    Ordered,
}

/// Configuration for the timing request layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TimingConfig {
    /// Buffer radius used when a request or course gives none.
    /// Default: 10 meters
    pub default_buffer_m: u32,

    /// Maximum trackpoints accepted per request.
    /// Default: 200,000
    pub max_points: u32,

    /// Maximum gates accepted per request or course.
    /// Default: 500
    pub max_gates: u32,

    /// Checkpoint visitation rule.
    /// Default: unordered
    pub checkpoint_order: CheckpointOrder,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_buffer_m: 10,
            max_points: 200_000,
            max_gates: 500,
            checkpoint_order: CheckpointOrder::Unordered,
        }
    }
}

impl TimingConfig {
    /// Read overrides from `GATE_TIMING_*` environment variables.
    ///
    /// Unset or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_buffer_m: env::var("GATE_TIMING_DEFAULT_BUFFER_M")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&b| b > 0)
                .unwrap_or(defaults.default_buffer_m),
            max_points: env::var("GATE_TIMING_MAX_POINTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_points),
            max_gates: env::var("GATE_TIMING_MAX_GATES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_gates),
            checkpoint_order: match env::var("GATE_TIMING_ORDERED_CHECKPOINTS") {
                Ok(raw) if parse_flag(&raw) => CheckpointOrder::Ordered,
                _ => defaults.checkpoint_order,
            },
        }
    }

    pub fn with_checkpoint_order(mut self, order: CheckpointOrder) -> Self {
        self.checkpoint_order = order;
        self
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TimingConfig::default();
        assert_eq!(config.default_buffer_m, 10);
        assert_eq!(config.checkpoint_order, CheckpointOrder::Unordered);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("on"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }
}
