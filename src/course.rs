//! Course definitions and gate-shape validation.
//!
//! A course is a named, ordered list of gates with one buffer radius shared
//! by every gate and checkpoint. Gate JSON is checked here before it ever
//! reaches the timing engine: a gate without `pairId`, `start` or `end` is a
//! caller bug and is rejected with [`TimingError::InvalidGate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::resolve_buffer;
use crate::config::TimingConfig;
use crate::geo_utils::compute_bounds;
use crate::timing::compute_segment_times_with_order;
use crate::{Bounds, Coordinate, Gate, SegmentResult, TimingError, TrackPoint};

/// A stored race course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    pub name: String,
    pub buffer_m: u32,
    pub gates: Vec<Gate>,
    pub created_by: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// API-facing view of a course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSummary {
    pub id: u64,
    pub name: String,
    pub buffer_m: u32,
    pub gates: Vec<Gate>,
    pub gate_count: usize,
    /// Box around every gate and checkpoint coordinate
    pub bounds: Option<Bounds>,
    pub created_by: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Course {
    /// Build a course from a creation payload.
    ///
    /// Requires a non-empty `name` and at least one well-formed gate. A
    /// missing or zero `buffer_m` takes the configured default.
    pub fn from_json(id: u64, body: &Value, config: &TimingConfig) -> Result<Self, TimingError> {
        let name = body
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| TimingError::InvalidPayload("name and at least one gate are required".into()))?;

        let gates = gates_from_json(body.get("gates").unwrap_or(&Value::Null))?;
        if gates.is_empty() {
            return Err(TimingError::InvalidPayload("name and at least one gate are required".into()));
        }
        if gates.len() > config.max_gates as usize {
            return Err(TimingError::TooManyGates { count: gates.len(), max: config.max_gates as usize });
        }

        let optional_str = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            id,
            name: name.to_string(),
            buffer_m: resolve_buffer(body.get("buffer_m"), config)?,
            gates,
            created_by: optional_str("created_by"),
            description: optional_str("description"),
            image_url: optional_str("image_url"),
            created_at: Utc::now(),
        })
    }

    /// Every gate, start, end and checkpoint coordinate of the course.
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.gates
            .iter()
            .flat_map(|g| {
                std::iter::once(g.start)
                    .chain(std::iter::once(g.end))
                    .chain(g.checkpoints.iter().copied())
            })
            .collect()
    }

    pub fn summary(&self) -> CourseSummary {
        CourseSummary {
            id: self.id,
            name: self.name.clone(),
            buffer_m: self.buffer_m,
            gates: self.gates.clone(),
            gate_count: self.gates.len(),
            bounds: compute_bounds(&self.coordinates()),
            created_by: self.created_by.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            created_at: self.created_at,
        }
    }

    /// Time a track over this course with the course's own buffer.
    pub fn segment_times(&self, points: &[TrackPoint], config: &TimingConfig) -> Vec<SegmentResult> {
        compute_segment_times_with_order(points, &self.gates, self.buffer_m, config.checkpoint_order)
    }
}

// ============================================================================
// Gate Validation
// ============================================================================

fn is_coordinate(value: &Value) -> bool {
    value.get("lat").is_some_and(Value::is_number) && value.get("lon").is_some_and(Value::is_number)
}

fn invalid(index: usize, reason: &str) -> TimingError {
    TimingError::InvalidGate { index, reason: reason.to_string() }
}

/// Check the shape of raw gate objects.
///
/// Each gate needs an integer `pairId` and `start`/`end` coordinates.
/// `checkpoints`, when present and not null, must be a list of coordinates.
pub fn validate_gates(gates: &[Value]) -> Result<(), TimingError> {
    for (index, gate) in gates.iter().enumerate() {
        if !gate.is_object() {
            return Err(invalid(index, "gate must be an object"));
        }
        if !gate.get("pairId").is_some_and(|id| id.is_i64() || id.is_u64()) {
            return Err(invalid(index, "missing or non-integer pairId"));
        }
        for key in ["start", "end"] {
            match gate.get(key) {
                Some(coord) if is_coordinate(coord) => {}
                Some(_) => return Err(invalid(index, &format!("{} must have numeric lat and lon", key))),
                None => return Err(invalid(index, &format!("missing {}", key))),
            }
        }
        match gate.get("checkpoints") {
            None | Some(Value::Null) => {}
            Some(Value::Array(cps)) if cps.iter().all(is_coordinate) => {}
            Some(_) => return Err(invalid(index, "checkpoints must be a list of {lat, lon}")),
        }
    }
    Ok(())
}

/// Decode a JSON gate list, rejecting malformed gates.
///
/// `null` decodes to no gates.
///
/// # Example
/// ```
/// use gate_timing::gates_from_json;
///
/// let json = serde_json::json!([
///     {"pairId": 1, "start": {"lat": 0.0, "lon": 0.0}, "end": {"lat": 0.0, "lon": 0.001}}
/// ]);
/// let gates = gates_from_json(&json).unwrap();
/// assert_eq!(gates[0].display_name(), "Pair 1");
///
/// let broken = serde_json::json!([{"pairId": 1, "start": {"lat": 0.0, "lon": 0.0}}]);
/// assert!(gates_from_json(&broken).is_err());
/// ```
pub fn gates_from_json(value: &Value) -> Result<Vec<Gate>, TimingError> {
    let raw = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(raw) => raw,
        _ => return Err(TimingError::InvalidPayload("gates must be a list".into())),
    };

    validate_gates(raw)?;

    raw.iter()
        .enumerate()
        .map(|(index, gate)| {
            Gate::deserialize(gate).map_err(|e| invalid(index, &e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gate_json(id: i64) -> Value {
        json!({"pairId": id, "start": {"lat": 0.0, "lon": 0.0}, "end": {"lat": 0.0, "lon": 0.001}})
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        let mut with_cps = gate_json(2);
        with_cps["checkpoints"] = json!([{"lat": 0.0, "lon": 0.0005}]);
        assert!(validate_gates(&[gate_json(1), with_cps]).is_ok());
    }

    #[test]
    fn test_validate_reports_index() {
        let missing_end = json!({"pairId": 2, "start": {"lat": 0.0, "lon": 0.0}});
        match validate_gates(&[gate_json(1), missing_end]) {
            Err(TimingError::InvalidGate { index, reason }) => {
                assert_eq!(index, 1);
                assert!(reason.contains("end"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_bad_checkpoints() {
        let mut gate = gate_json(1);
        gate["checkpoints"] = json!([{"lat": 1.0}]);
        assert!(validate_gates(&[gate.clone()]).is_err());
        gate["checkpoints"] = json!({"lat": 1.0, "lon": 2.0});
        assert!(validate_gates(&[gate]).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_pair_id() {
        let gate = json!({"start": {"lat": 0.0, "lon": 0.0}, "end": {"lat": 0.0, "lon": 0.001}});
        assert!(matches!(validate_gates(&[gate]), Err(TimingError::InvalidGate { index: 0, .. })));
    }

    #[test]
    fn test_gates_from_json() {
        assert!(gates_from_json(&Value::Null).unwrap().is_empty());
        assert!(gates_from_json(&json!({"pairId": 1})).is_err());

        let mut named = gate_json(4);
        named["name"] = json!("Descent");
        named["checkpoints"] = Value::Null;
        let gates = gates_from_json(&json!([named])).unwrap();
        assert_eq!(gates[0].pair_id, 4);
        assert_eq!(gates[0].display_name(), "Descent");
        assert!(gates[0].checkpoints.is_empty());
    }

    #[test]
    fn test_course_from_json() {
        let config = TimingConfig::default();
        let body = json!({"name": "Ridge", "gates": [gate_json(1)], "created_by": "ana"});
        let course = Course::from_json(7, &body, &config).unwrap();
        assert_eq!(course.id, 7);
        assert_eq!(course.buffer_m, 10);
        assert_eq!(course.created_by.as_deref(), Some("ana"));

        let body = json!({"name": "Ridge", "buffer_m": 25, "gates": [gate_json(1)]});
        assert_eq!(Course::from_json(8, &body, &config).unwrap().buffer_m, 25);
    }

    #[test]
    fn test_course_requires_name_and_gates() {
        let config = TimingConfig::default();
        assert!(Course::from_json(1, &json!({"gates": [gate_json(1)]}), &config).is_err());
        assert!(Course::from_json(1, &json!({"name": "x", "gates": []}), &config).is_err());
        assert!(Course::from_json(1, &json!({"name": "x"}), &config).is_err());
    }

    #[test]
    fn test_course_gate_limit() {
        let config = TimingConfig { max_gates: 1, ..TimingConfig::default() };
        let body = json!({"name": "x", "gates": [gate_json(1), gate_json(2)]});
        assert!(matches!(
            Course::from_json(1, &body, &config),
            Err(TimingError::TooManyGates { count: 2, max: 1 })
        ));
    }

    #[test]
    fn test_summary_bounds_cover_checkpoints() {
        let mut gate = gate_json(1);
        gate["checkpoints"] = json!([{"lat": 0.5, "lon": -0.5}]);
        let course = Course::from_json(1, &json!({"name": "x", "gates": [gate]}), &TimingConfig::default()).unwrap();
        let summary = course.summary();
        assert_eq!(summary.gate_count, 1);
        let bounds = summary.bounds.unwrap();
        assert_eq!(bounds.max_lat, 0.5);
        assert_eq!(bounds.min_lng, -0.5);
        assert_eq!(bounds.max_lng, 0.001);
    }

    #[test]
    fn test_course_segment_times_uses_course_buffer() {
        let body = json!({"name": "x", "buffer_m": 50, "gates": [gate_json(1)]});
        let course = Course::from_json(1, &body, &TimingConfig::default()).unwrap();
        let points = vec![
            TrackPoint::timed(0.0, 0.0002, "2024-01-01T00:00:00Z"),
            TrackPoint::timed(0.0, 0.001, "2024-01-01T00:01:30Z"),
        ];
        let results = course.segment_times(&points, &TimingConfig::default());
        assert_eq!(results[0].time_sec.seconds(), Some(90));
    }
}
