//! Fetch Strava activities and time them over a single gate.
//!
//! Run with:
//!   STRAVA_ACCESS_TOKEN=... cargo run --example strava_fetch --features http -- <activity_id>...

use gate_timing::{compute_segment_times, Coordinate, Gate, StravaFetcher};

#[tokio::main]
async fn main() {
    let token = match std::env::var("STRAVA_ACCESS_TOKEN") {
        Ok(token) => token,
        Err(_) => {
            eprintln!("Set STRAVA_ACCESS_TOKEN to a valid access token");
            return;
        }
    };
    let ids: Vec<u64> = std::env::args().skip(1).filter_map(|a| a.parse().ok()).collect();
    if ids.is_empty() {
        eprintln!("Usage: strava_fetch <activity_id>...");
        return;
    }

    let fetcher = match StravaFetcher::new(&token) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    let gate = Gate::new(1, Coordinate::new(51.5074, -0.1278), Coordinate::new(51.5110, -0.1320))
        .with_name("Demo gate");

    for (id, result) in fetcher.fetch_activity_tracks(ids).await {
        match result {
            Ok(track) => {
                let segments = compute_segment_times(&track.points, std::slice::from_ref(&gate), 25);
                println!("{} ({}): {} points, {} -> {}", track.name, id, track.points.len(), segments[0].segment, segments[0].time_sec);
            }
            Err(e) => println!("{}: failed: {}", id, e),
        }
    }
}
