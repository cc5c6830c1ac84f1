//! Strava activity streams → trackpoints.
//!
//! Streams are requested with `key_by_type=true`, so the body is an object
//! keyed by stream type. `time` holds seconds since the activity's
//! `start_date`; `latlng` and `altitude` are parallel arrays.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp::{format_timestamp, parse_timestamp};
use crate::{TimingError, TrackPoint};

/// One stream's samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stream<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<Option<T>>,
}

/// The streams used for timing, as returned by `/activities/{id}/streams`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSet {
    #[serde(default)]
    pub time: Option<Stream<f64>>,
    #[serde(default)]
    pub latlng: Option<Stream<[f64; 2]>>,
    #[serde(default)]
    pub altitude: Option<Stream<f64>>,
}

/// The parts of `/activities/{id}` needed to place streams in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub start_date: String,
}

impl ActivitySummary {
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Activity {}", self.id),
        }
    }

    pub fn start_time(&self) -> Result<DateTime<Utc>, TimingError> {
        parse_timestamp(&self.start_date)
            .ok_or_else(|| TimingError::InvalidPayload(format!("bad start_date: {}", self.start_date)))
    }
}

fn sample<T: Copy>(stream: &Option<Stream<T>>, idx: usize) -> Option<T> {
    stream.as_ref().and_then(|s| s.data.get(idx).copied().flatten())
}

/// Build trackpoints from an activity's streams.
///
/// One point per `latlng` sample. Samples without an elapsed time, without
/// a position, or whose time falls outside the representable range are
/// dropped.
///
/// # Example
/// ```
/// use gate_timing::{points_from_streams, StreamSet};
///
/// let streams: StreamSet = serde_json::from_value(serde_json::json!({
///     "time": {"data": [0, 300]},
///     "latlng": {"data": [[0.0, 0.0], [0.0, 0.001]]}
/// })).unwrap();
/// let start = "2024-01-01T00:00:00Z".parse().unwrap();
///
/// let points = points_from_streams(start, &streams);
/// assert_eq!(points[1].time.as_deref(), Some("2024-01-01T00:05:00Z"));
/// ```
pub fn points_from_streams(start: DateTime<Utc>, streams: &StreamSet) -> Vec<TrackPoint> {
    let count = streams.latlng.as_ref().map_or(0, |s| s.data.len());

    (0..count)
        .filter_map(|idx| {
            let [lat, lon] = sample(&streams.latlng, idx)?;
            let elapsed = sample(&streams.time, idx).filter(|t| t.is_finite())?;
            let offset = Duration::try_milliseconds((elapsed * 1000.0).round() as i64)?;
            let at = start.checked_add_signed(offset)?;
            Some(TrackPoint {
                lat,
                lon,
                ele: sample(&streams.altitude, idx),
                time: Some(format_timestamp(&at)),
            })
        })
        .collect()
}
