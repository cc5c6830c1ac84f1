//! Resolve many gates over a long synthetic track, sequentially and in parallel.
//!
//! Run with: cargo run --release --example parallel_timing --features parallel

use std::time::Instant;

use gate_timing::{
    compute_segment_times_parallel, compute_segment_times_with_order, CheckpointOrder, Coordinate, Gate,
    TrackPoint,
};

fn main() {
    // One fix per second heading east along the equator, ~1.1m apart
    let points: Vec<TrackPoint> = (0..20_000)
        .map(|i| {
            let at = chrono::DateTime::from_timestamp(1_717_200_000 + i as i64, 0).unwrap_or_default();
            TrackPoint {
                lat: 0.0,
                lon: i as f64 * 0.00001,
                ele: None,
                time: Some(at.to_rfc3339()),
            }
        })
        .collect();

    let gates: Vec<Gate> = (0..200)
        .map(|i| {
            let start = i as f64 * 0.0009;
            Gate::new(i, Coordinate::new(0.0, start), Coordinate::new(0.0, start + 0.0009))
        })
        .collect();

    println!("{} points, {} gates\n", points.len(), gates.len());

    let start = Instant::now();
    let sequential = compute_segment_times_with_order(&points, &gates, 10, CheckpointOrder::Unordered);
    println!("Sequential: {:?}", start.elapsed());

    let start = Instant::now();
    let parallel = compute_segment_times_parallel(&points, &gates, 10, CheckpointOrder::Unordered);
    println!("Parallel:   {:?}", start.elapsed());

    assert_eq!(sequential, parallel);
    let timed = parallel.iter().filter(|s| s.time_sec.is_resolved()).count();
    println!("\n{}/{} gates timed", timed, parallel.len());
}
