//! The compute-segment-times request contract.
//!
//! Request:
//! `{"points": [{lat, lon, ele?, time?}], "gates": [...], "buffer_m": 10}`
//!
//! Response:
//! `{"segments": [{"segment": "Pair 1", "timeSec": 300 | "N/A", "valid": true}]}`

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::TimingConfig;
use crate::course::gates_from_json;
use crate::timing::compute_segment_times_with_order;
use crate::{SegmentResult, TimingError, TrackPoint};

/// A decoded compute-segment-times request.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTimesRequest {
    pub points: Vec<TrackPoint>,
    pub gates: Vec<crate::Gate>,
    /// `None` when the payload gave no usable radius
    pub buffer_m: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTimesResponse {
    pub segments: Vec<SegmentResult>,
}

/// Interpret a payload `buffer_m`.
///
/// Missing, `null`, `false`, `""` and `0` mean "no radius given" (`None`).
/// Fractions are truncated. Negative or non-finite radii are rejected.
pub fn parse_buffer(raw: Option<&Value>) -> Result<Option<u32>, TimingError> {
    let value = match raw {
        None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok(None),
        Some(Value::Bool(true)) => 1.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) if s.is_empty() => return Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| TimingError::InvalidPayload(format!("buffer_m is not an integer: {:?}", s)))?
            as f64,
        Some(other) => {
            return Err(TimingError::InvalidPayload(format!("buffer_m is not a number: {}", other)))
        }
    };

    if !value.is_finite() || value < 0.0 {
        return Err(TimingError::InvalidBuffer(value));
    }
    let truncated = value.trunc();
    if truncated == 0.0 {
        return Ok(None);
    }
    Ok(Some(truncated.min(f64::from(u32::MAX)) as u32))
}

/// Reject requests over the configured point or gate limits.
pub fn check_limits(point_count: usize, gate_count: usize, config: &TimingConfig) -> Result<(), TimingError> {
    if point_count > config.max_points as usize {
        return Err(TimingError::TooManyPoints { count: point_count, max: config.max_points as usize });
    }
    if gate_count > config.max_gates as usize {
        return Err(TimingError::TooManyGates { count: gate_count, max: config.max_gates as usize });
    }
    Ok(())
}

/// [`parse_buffer`], falling back to the configured default radius.
pub fn resolve_buffer(raw: Option<&Value>, config: &TimingConfig) -> Result<u32, TimingError> {
    Ok(parse_buffer(raw)?.unwrap_or(config.default_buffer_m))
}

impl SegmentTimesRequest {
    /// Decode and validate a request body.
    ///
    /// Missing `points` or `gates` decode as empty lists. Gates are shape
    /// checked. Points only need `lat`/`lon`; untimed points are skipped
    /// during timing.
    pub fn from_json(body: &Value) -> Result<Self, TimingError> {
        let points = match body.get("points") {
            None | Some(Value::Null) => Vec::new(),
            Some(raw) => Vec::<TrackPoint>::deserialize(raw)?,
        };
        let gates = gates_from_json(body.get("gates").unwrap_or(&Value::Null))?;

        let buffer_m = parse_buffer(body.get("buffer_m"))?;

        Ok(Self { points, gates, buffer_m })
    }

    pub fn parse(body: &str) -> Result<Self, TimingError> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_json(&value)
    }
}

/// Answer a compute-segment-times request.
///
/// An empty gate list answers `{"segments": []}` without timing anything.
///
/// # Example
/// ```
/// use gate_timing::{handle_segment_times, SegmentTimesRequest, TimingConfig};
///
/// let body = serde_json::json!({
///     "points": [
///         {"lat": 0.0, "lon": 0.0, "time": "2024-01-01T00:00:00Z"},
///         {"lat": 0.0, "lon": 0.001, "time": "2024-01-01T00:05:00Z"}
///     ],
///     "gates": [{"pairId": 1, "start": {"lat": 0, "lon": 0}, "end": {"lat": 0, "lon": 0.001}}],
///     "buffer_m": 50
/// });
///
/// let request = SegmentTimesRequest::from_json(&body).unwrap();
/// let response = handle_segment_times(&request, &TimingConfig::default()).unwrap();
/// assert_eq!(
///     serde_json::to_value(&response).unwrap(),
///     serde_json::json!({"segments": [{"segment": "Pair 1", "timeSec": 300, "valid": true}]})
/// );
/// ```
pub fn handle_segment_times(
    request: &SegmentTimesRequest,
    config: &TimingConfig,
) -> Result<SegmentTimesResponse, TimingError> {
    if request.gates.is_empty() {
        return Ok(SegmentTimesResponse { segments: Vec::new() });
    }
    check_limits(request.points.len(), request.gates.len(), config)?;

    let buffer_m = request.buffer_m.unwrap_or(config.default_buffer_m);
    let segments = compute_segment_times_with_order(
        &request.points,
        &request.gates,
        buffer_m,
        config.checkpoint_order,
    );
    debug!(
        "segment-times: {} points, {} gates, {}m buffer -> {} timed",
        request.points.len(),
        request.gates.len(),
        buffer_m,
        segments.iter().filter(|s| s.time_sec.is_resolved()).count()
    );

    Ok(SegmentTimesResponse { segments })
}
