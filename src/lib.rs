//! # Gate Timing
//!
//! Segment timing for GPS tracks recorded over gate-pair courses.
//!
//! This library provides:
//! - Gate-pair timing: the fastest valid start→end crossing per gate
//! - Checkpoint validation between the chosen start and end fixes
//! - Course definitions, leaderboard submission and GPX / Strava import
//!
//! ## Features
//!
//! - **`parallel`** - Resolve gates in parallel with rayon
//! - **`http`** - Enable HTTP client for Strava activity streams
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use gate_timing::{compute_segment_times, Coordinate, Gate, SegmentTime, TrackPoint};
//!
//! let points = vec![
//!     TrackPoint::timed(0.0, 0.0, "2024-01-01T00:00:00Z"),
//!     TrackPoint::timed(0.0, 0.001, "2024-01-01T00:05:00Z"),
//! ];
//! let gates = vec![Gate::new(1, Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.001))];
//!
//! let results = compute_segment_times(&points, &gates, 50);
//! assert_eq!(results[0].segment, "Pair 1");
//! assert_eq!(results[0].time_sec, SegmentTime::Timed { seconds: 300 });
//! assert!(results[0].valid);
//! ```

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub mod error;
pub use error::TimingError;

pub mod config;
pub use config::{CheckpointOrder, TimingConfig};

pub mod geo_utils;
pub mod timestamp;

// Gate hit indexing, crossing search and checkpoint validation
pub mod timing;
pub use timing::{
    best_crossing, checkpoints_visited, compute_segment_times, compute_segment_times_with_order,
    gate_hits, Crossing, GateHit,
};

#[cfg(feature = "parallel")]
pub use timing::compute_segment_times_parallel;

pub mod course;
pub use course::{gates_from_json, validate_gates, Course, CourseSummary};

pub mod api;
pub use api::{handle_segment_times, SegmentTimesRequest, SegmentTimesResponse};

pub mod leaderboard;
pub use leaderboard::{Leaderboard, LeaderboardEntry, Submission};

pub mod gpx_import;
pub use gpx_import::{parse_gpx_to_tracks, ParsedTrack};

pub mod strava;
pub use strava::{points_from_streams, StreamSet};

// HTTP module for Strava stream fetching
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ActivityTrack, StravaFetcher};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("GateTimingRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A coordinate in signed decimal degrees.
///
/// # Example
/// ```
/// use gate_timing::Coordinate;
/// let gate = Coordinate::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One recorded fix of a GPS track.
///
/// `time` is kept as recorded. A point whose time is missing or does not
/// parse still occupies its index in the track but never counts as a gate hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, deserialize_with = "lenient_ele")]
    pub ele: Option<f64>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub time: Option<String>,
}

impl TrackPoint {
    /// Create an untimed point.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon, ele: None, time: None }
    }

    /// Create a point recorded at `time`.
    pub fn timed(lat: f64, lon: f64, time: &str) -> Self {
        Self { lat, lon, ele: None, time: Some(time.to_string()) }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// One timed gate pair of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Gate {
    #[serde(rename = "pairId")]
    pub pair_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub start: Coordinate,
    pub end: Coordinate,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub checkpoints: Vec<Coordinate>,
}

impl Gate {
    /// Create an unnamed gate without checkpoints.
    pub fn new(pair_id: i64, start: Coordinate, end: Coordinate) -> Self {
        Self { pair_id, name: None, start, end, checkpoints: Vec::new() }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: Vec<Coordinate>) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    /// Name shown for this gate's segment: its own name, else `"Pair {pairId}"`.
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Pair {}", self.pair_id),
        }
    }
}

/// Elapsed time through one gate, or the absence of any crossing.
///
/// Serialized as a JSON integer or the string `"N/A"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum SegmentTime {
    Timed { seconds: i64 },
    Unresolved,
}

/// JSON marker for [`SegmentTime::Unresolved`].
pub const UNRESOLVED_MARKER: &str = "N/A";

impl SegmentTime {
    pub fn seconds(&self) -> Option<i64> {
        match self {
            SegmentTime::Timed { seconds } => Some(*seconds),
            SegmentTime::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, SegmentTime::Timed { .. })
    }
}

impl std::fmt::Display for SegmentTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentTime::Timed { seconds } => write!(f, "{}", seconds),
            SegmentTime::Unresolved => f.write_str(UNRESOLVED_MARKER),
        }
    }
}

impl Serialize for SegmentTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SegmentTime::Timed { seconds } => serializer.serialize_i64(*seconds),
            SegmentTime::Unresolved => serializer.serialize_str(UNRESOLVED_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for SegmentTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) if s == UNRESOLVED_MARKER => Ok(SegmentTime::Unresolved),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(|seconds| SegmentTime::Timed { seconds })
                .ok_or_else(|| de::Error::custom(format!("segment time is not an integer: {}", n))),
            other => Err(de::Error::custom(format!("invalid segment time: {}", other))),
        }
    }
}

/// Timing outcome for one gate, in the order the gates were given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SegmentResult {
    pub segment: String,
    #[serde(rename = "timeSec")]
    pub time_sec: SegmentTime,
    /// False when no crossing was found or a checkpoint was missed.
    pub valid: bool,
}

impl SegmentResult {
    pub fn unresolved(segment: String) -> Self {
        Self { segment, time_sec: SegmentTime::Unresolved, valid: false }
    }
}

/// Bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

/// Keep string times, treat every other JSON value as "no time".
fn lenient_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Keep numeric elevations, treat every other JSON value as "no elevation".
fn lenient_ele<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        _ => None,
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{info, warn};

    /// Compute segment times with the default (unordered) checkpoint rule.
    #[uniffi::export]
    pub fn ffi_compute_segment_times(
        points: Vec<TrackPoint>,
        gates: Vec<Gate>,
        buffer_m: u32,
    ) -> Vec<SegmentResult> {
        init_logging();
        info!(
            "[GateTimingRust] compute_segment_times: {} points, {} gates, {}m buffer",
            points.len(),
            gates.len(),
            buffer_m
        );

        let start = std::time::Instant::now();
        let results = crate::timing::compute_segment_times_parallel(
            &points,
            &gates,
            buffer_m,
            CheckpointOrder::Unordered,
        );
        info!("[GateTimingRust] Resolved {} segments in {:?}", results.len(), start.elapsed());

        results
    }

    /// Compute segment times using a timing configuration.
    ///
    /// A zero buffer falls back to the configured default. Requests over the
    /// configured limits are rejected rather than timed.
    #[uniffi::export]
    pub fn ffi_compute_segment_times_with_config(
        points: Vec<TrackPoint>,
        gates: Vec<Gate>,
        buffer_m: u32,
        config: TimingConfig,
    ) -> Result<Vec<SegmentResult>, TimingError> {
        init_logging();
        let buffer_m = if buffer_m == 0 { config.default_buffer_m } else { buffer_m };
        if let Err(e) = crate::api::check_limits(points.len(), gates.len(), &config) {
            warn!("[GateTimingRust] Rejected request: {}", e);
            return Err(e);
        }
        Ok(crate::timing::compute_segment_times_parallel(
            &points,
            &gates,
            buffer_m,
            config.checkpoint_order,
        ))
    }

    /// Parse GPX text into named tracks. Returns no tracks on parse failure.
    #[uniffi::export]
    pub fn ffi_parse_gpx(text: String) -> Vec<ParsedTrack> {
        init_logging();
        match crate::gpx_import::parse_gpx_to_tracks(&text) {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("[GateTimingRust] GPX import failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Get default configuration.
    #[uniffi::export]
    pub fn default_timing_config() -> TimingConfig {
        init_logging();
        TimingConfig::default()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn two_points_one_gate() -> (Vec<TrackPoint>, Vec<Gate>) {
            (
                vec![
                    TrackPoint::timed(0.0, 0.0, "2024-01-01T00:00:00Z"),
                    TrackPoint::timed(0.0, 0.001, "2024-01-01T00:05:00Z"),
                ],
                vec![Gate::new(1, Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.001))],
            )
        }

        #[test]
        fn test_with_config_over_limit_is_an_error() {
            let (points, gates) = two_points_one_gate();
            let config = TimingConfig { max_points: 1, ..TimingConfig::default() };
            assert!(matches!(
                ffi_compute_segment_times_with_config(points, gates, 50, config),
                Err(TimingError::TooManyPoints { count: 2, max: 1 })
            ));
        }

        #[test]
        fn test_with_config_one_result_per_gate() {
            let (points, gates) = two_points_one_gate();
            let results = ffi_compute_segment_times_with_config(points, gates, 50, TimingConfig::default()).unwrap();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].time_sec, SegmentTime::Timed { seconds: 300 });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
