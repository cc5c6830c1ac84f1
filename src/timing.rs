//! # Segment Timing
//!
//! Turns a recorded track and an ordered list of gate pairs into one
//! [`SegmentResult`] per gate.
//!
//! ## Algorithm
//! 1. Parse every point's timestamp once (untimed points keep their index)
//! 2. For each gate, collect timed points within the buffer of its start and
//!    of its end ("hits")
//! 3. Search every (start hit, end hit) pair for the shortest crossing whose
//!    end comes strictly later in both index and time
//! 4. Check the gate's checkpoints against the points between the winning
//!    start and end indices, inclusive
//!
//! The search is exhaustive over hit pairs. Hit lists are proximity
//! filtered, so they stay small relative to the track.

use log::debug;

use crate::config::CheckpointOrder;
use crate::geo_utils::within_radius;
use crate::timestamp::parse_timestamp_ms;
use crate::{Coordinate, Gate, SegmentResult, SegmentTime, TrackPoint};

/// A timed trackpoint within the buffer of a gate coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateHit {
    /// Index into the original track
    pub index: usize,
    /// Milliseconds since the Unix epoch
    pub time_ms: f64,
}

/// The winning start/end pair for one gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub start_index: usize,
    pub end_index: usize,
    /// Always strictly positive
    pub duration_ms: f64,
}

impl Crossing {
    /// Duration rounded to whole seconds, ties to even.
    pub fn seconds(&self) -> i64 {
        (self.duration_ms / 1000.0).round_ties_even() as i64
    }
}

// ============================================================================
// Hit Indexing
// ============================================================================

/// Parse each point's time, keeping `None` for missing or unparseable times.
fn point_times(points: &[TrackPoint]) -> Vec<Option<f64>> {
    points
        .iter()
        .map(|p| p.time.as_deref().and_then(parse_timestamp_ms))
        .collect()
}

fn hits_near(
    points: &[TrackPoint],
    times: &[Option<f64>],
    target: &Coordinate,
    radius_m: f64,
) -> Vec<GateHit> {
    points
        .iter()
        .zip(times)
        .enumerate()
        .filter_map(|(index, (point, time))| {
            let time_ms = (*time)?;
            within_radius(&point.coordinate(), target, radius_m).then_some(GateHit { index, time_ms })
        })
        .collect()
}

/// Every timed point within `radius_m` of `target`, in track order.
///
/// # Example
/// ```
/// use gate_timing::{gate_hits, Coordinate, TrackPoint};
///
/// let points = vec![
///     TrackPoint::timed(0.0, 0.0, "2024-01-01T00:00:00Z"),
///     TrackPoint::new(0.0, 0.0),  // no time: never a hit
///     TrackPoint::timed(0.0, 1.0, "2024-01-01T00:01:00Z"),
/// ];
///
/// let hits = gate_hits(&points, &Coordinate::new(0.0, 0.0), 10.0);
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].index, 0);
/// ```
pub fn gate_hits(points: &[TrackPoint], target: &Coordinate, radius_m: f64) -> Vec<GateHit> {
    hits_near(points, &point_times(points), target, radius_m)
}

// ============================================================================
// Crossing Search
// ============================================================================

/// Find the shortest crossing from a start hit to a later end hit.
///
/// A pair counts only if the end hit has a higher index and a later time
/// than the start hit. Among equal durations the first pair found (starts
/// outer, ends inner) wins. Returns `None` when no pair qualifies.
pub fn best_crossing(starts: &[GateHit], ends: &[GateHit]) -> Option<Crossing> {
    let mut best: Option<Crossing> = None;

    for s in starts {
        for e in ends {
            if e.index <= s.index {
                continue;
            }
            let duration_ms = e.time_ms - s.time_ms;
            if duration_ms <= 0.0 {
                continue;
            }
            if best.map_or(true, |b| duration_ms < b.duration_ms) {
                best = Some(Crossing {
                    start_index: s.index,
                    end_index: e.index,
                    duration_ms,
                });
            }
        }
    }

    best
}

// ============================================================================
// Checkpoint Validation
// ============================================================================

/// Whether every checkpoint was passed between `start_index` and `end_index`
/// (inclusive). Untimed points count here. An empty list always passes.
pub fn checkpoints_visited(
    points: &[TrackPoint],
    checkpoints: &[Coordinate],
    start_index: usize,
    end_index: usize,
    radius_m: f64,
    order: CheckpointOrder,
) -> bool {
    if points.is_empty() {
        return checkpoints.is_empty();
    }
    let near = |i: usize, cp: &Coordinate| within_radius(&points[i].coordinate(), cp, radius_m);
    let last = end_index.min(points.len() - 1);

    match order {
        CheckpointOrder::Unordered => checkpoints
            .iter()
            .all(|cp| (start_index..=last).any(|i| near(i, cp))),
        CheckpointOrder::Ordered => {
            let mut from = start_index;
            for cp in checkpoints {
                match (from..=last).find(|&i| near(i, cp)) {
                    Some(i) => from = i + 1,
                    None => return false,
                }
            }
            true
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

fn resolve_gate(
    points: &[TrackPoint],
    times: &[Option<f64>],
    gate: &Gate,
    radius_m: f64,
    order: CheckpointOrder,
) -> SegmentResult {
    let segment = gate.display_name();

    let starts = hits_near(points, times, &gate.start, radius_m);
    let ends = hits_near(points, times, &gate.end, radius_m);

    let Some(crossing) = best_crossing(&starts, &ends) else {
        debug!(
            "[{}] no crossing ({} start hits, {} end hits)",
            segment,
            starts.len(),
            ends.len()
        );
        return SegmentResult::unresolved(segment);
    };

    let valid = checkpoints_visited(
        points,
        &gate.checkpoints,
        crossing.start_index,
        crossing.end_index,
        radius_m,
        order,
    );
    debug!(
        "[{}] crossing {}..{} in {}s (checkpoints ok: {})",
        segment,
        crossing.start_index,
        crossing.end_index,
        crossing.seconds(),
        valid
    );

    SegmentResult {
        segment,
        time_sec: SegmentTime::Timed { seconds: crossing.seconds() },
        valid,
    }
}

/// Compute one segment result per gate, in gate order.
///
/// Checkpoints may be visited in any order. Malformed points are skipped;
/// a gate that cannot be crossed yields `"N/A"` rather than an error.
///
/// # Example
/// ```
/// use gate_timing::{compute_segment_times, Coordinate, Gate, SegmentTime, TrackPoint};
///
/// let points = vec![
///     TrackPoint::timed(0.0, 0.0, "2024-01-01T00:00:00Z"),
///     TrackPoint::timed(0.0, 0.001, "2024-01-01T00:05:00Z"),
/// ];
/// let far_end = Gate::new(1, Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 5.0));
///
/// let results = compute_segment_times(&points, &[far_end], 50);
/// assert_eq!(results[0].time_sec, SegmentTime::Unresolved);
/// assert!(!results[0].valid);
/// ```
pub fn compute_segment_times(
    points: &[TrackPoint],
    gates: &[Gate],
    buffer_m: u32,
) -> Vec<SegmentResult> {
    compute_segment_times_with_order(points, gates, buffer_m, CheckpointOrder::Unordered)
}

/// Same as [`compute_segment_times`] with an explicit checkpoint rule.
pub fn compute_segment_times_with_order(
    points: &[TrackPoint],
    gates: &[Gate],
    buffer_m: u32,
    order: CheckpointOrder,
) -> Vec<SegmentResult> {
    let times = point_times(points);
    let radius_m = f64::from(buffer_m);

    gates
        .iter()
        .map(|gate| resolve_gate(points, &times, gate, radius_m, order))
        .collect()
}

/// Resolve gates using parallel processing.
///
/// Output order matches `gates`. Recommended for courses with many gates
/// over long tracks.
#[cfg(feature = "parallel")]
pub fn compute_segment_times_parallel(
    points: &[TrackPoint],
    gates: &[Gate],
    buffer_m: u32,
    order: CheckpointOrder,
) -> Vec<SegmentResult> {
    use rayon::prelude::*;

    let times = point_times(points);
    let radius_m = f64::from(buffer_m);

    gates
        .par_iter()
        .map(|gate| resolve_gate(points, &times, gate, radius_m, order))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
