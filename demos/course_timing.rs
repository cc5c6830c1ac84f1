//! Time a short ride over a two-gate course and submit it to a leaderboard.
//!
//! Run with: cargo run --example course_timing

use gate_timing::{Course, Leaderboard, Submission, TimingConfig, TrackPoint};

fn main() {
    let config = TimingConfig::default();

    let body = serde_json::json!({
        "name": "Riverside loop",
        "buffer_m": 25,
        "gates": [
            {
                "pairId": 1,
                "name": "Bridge sprint",
                "start": {"lat": 51.5074, "lon": -0.1278},
                "end": {"lat": 51.5090, "lon": -0.1300}
            },
            {
                "pairId": 2,
                "start": {"lat": 51.5090, "lon": -0.1300},
                "end": {"lat": 51.5110, "lon": -0.1320},
                "checkpoints": [{"lat": 51.5100, "lon": -0.1310}]
            }
        ]
    });

    let course = match Course::from_json(1, &body, &config) {
        Ok(course) => course,
        Err(e) => {
            eprintln!("Invalid course: {}", e);
            return;
        }
    };

    let ride = vec![
        TrackPoint::timed(51.5074, -0.1278, "2024-06-01T07:00:00Z"),
        TrackPoint::timed(51.5080, -0.1290, "2024-06-01T07:00:41Z"),
        TrackPoint::timed(51.5090, -0.1300, "2024-06-01T07:01:22Z"),
        TrackPoint::timed(51.5100, -0.1310, "2024-06-01T07:02:10Z"),
        TrackPoint::timed(51.5110, -0.1320, "2024-06-01T07:02:55Z"),
    ];

    println!("Course: {} ({} gates, {}m buffer)\n", course.name, course.gates.len(), course.buffer_m);

    for segment in course.segment_times(&ride, &config) {
        println!(
            "  {:<16} {:>6}  checkpoints ok: {}",
            segment.segment,
            segment.time_sec.to_string(),
            segment.valid
        );
    }

    let mut board = Leaderboard::new();
    board.add_course(course);

    let submission = Submission { username: "demo".to_string(), points: ride };
    match board.submit(1, &submission, &config) {
        Ok(entry) => println!("\nLeaderboard entry: {} in {}s", entry.username, entry.total_time_sec),
        Err(e) => println!("\nSubmission rejected: {}", e),
    }
}
