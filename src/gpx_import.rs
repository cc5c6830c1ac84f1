//! GPX import.
//!
//! Each `<trk>` becomes one [`ParsedTrack`] with its segments joined in
//! order. Files without any usable track fall back to their `<rte>`
//! elements. Point times are re-rendered as RFC 3339 UTC strings.

use std::io::Cursor;

use log::info;
use serde::{Deserialize, Serialize};

use crate::geo_utils::polyline_length;
use crate::timestamp::{format_timestamp, parse_timestamp};
use crate::{TimingError, TrackPoint};

/// A named sequence of trackpoints from a GPX file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ParsedTrack {
    pub name: String,
    pub points: Vec<TrackPoint>,
}

impl ParsedTrack {
    /// Recorded length in meters.
    pub fn length_m(&self) -> f64 {
        polyline_length(&self.points)
    }
}

fn to_track_point(waypoint: &gpx::Waypoint) -> TrackPoint {
    let point = waypoint.point();
    let time = waypoint
        .time
        .as_ref()
        .and_then(|t| t.format().ok())
        .and_then(|iso| parse_timestamp(&iso))
        .map(|dt| format_timestamp(&dt));

    TrackPoint {
        lat: point.y(),
        lon: point.x(),
        ele: waypoint.elevation,
        time,
    }
}

/// Parse GPX text into named tracks.
///
/// # Example
/// ```
/// use gate_timing::parse_gpx_to_tracks;
///
/// let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
/// <gpx version="1.1" creator="demo" xmlns="http://www.topografix.com/GPX/1/1">
///   <trk><trkseg>
///     <trkpt lat="0.0" lon="0.0"><time>2024-01-01T00:00:00Z</time></trkpt>
///     <trkpt lat="0.0" lon="0.001"><time>2024-01-01T00:05:00Z</time></trkpt>
///   </trkseg></trk>
/// </gpx>"#;
///
/// let tracks = parse_gpx_to_tracks(gpx).unwrap();
/// assert_eq!(tracks[0].name, "Track 1");
/// assert_eq!(tracks[0].points.len(), 2);
/// ```
pub fn parse_gpx_to_tracks(text: &str) -> Result<Vec<ParsedTrack>, TimingError> {
    let gpx = gpx::read(Cursor::new(text.as_bytes())).map_err(|e| TimingError::GpxParse(e.to_string()))?;

    let mut tracks: Vec<ParsedTrack> = gpx
        .tracks
        .iter()
        .enumerate()
        .map(|(idx, track)| ParsedTrack {
            name: track.name.clone().unwrap_or_else(|| format!("Track {}", idx + 1)),
            points: track
                .segments
                .iter()
                .flat_map(|seg| seg.points.iter().map(to_track_point))
                .collect(),
        })
        .filter(|t| !t.points.is_empty())
        .collect();

    if tracks.is_empty() {
        tracks = gpx
            .routes
            .iter()
            .enumerate()
            .map(|(idx, route)| ParsedTrack {
                name: route.name.clone().unwrap_or_else(|| format!("Route {}", idx + 1)),
                points: route.points.iter().map(to_track_point).collect(),
            })
            .filter(|t| !t.points.is_empty())
            .collect();
    }

    if tracks.is_empty() {
        return Err(TimingError::NoTracks);
    }

    info!(
        "[GpxImport] {} track(s), {} point(s)",
        tracks.len(),
        tracks.iter().map(|t| t.points.len()).sum::<usize>()
    );
    Ok(tracks)
}

/// Parse raw GPX bytes, replacing invalid UTF-8.
pub fn parse_gpx_bytes(bytes: &[u8]) -> Result<Vec<ParsedTrack>, TimingError> {
    parse_gpx_to_tracks(&String::from_utf8_lossy(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="tests" xmlns="http://www.topografix.com/GPX/1/1">
{}
</gpx>"#,
            body
        )
    }

    #[test]
    fn test_segments_are_joined() {
        let gpx = wrap(
            r#"<trk><name>Morning Ride</name>
                <trkseg>
                  <trkpt lat="45.0" lon="7.0"><ele>310.5</ele><time>2024-01-01T08:00:00Z</time></trkpt>
                </trkseg>
                <trkseg>
                  <trkpt lat="45.001" lon="7.0"></trkpt>
                  <trkpt lat="45.002" lon="7.0"><time>2024-01-01T08:01:00Z</time></trkpt>
                </trkseg>
              </trk>"#,
        );
        let tracks = parse_gpx_to_tracks(&gpx).unwrap();
        assert_eq!(tracks.len(), 1);
        let track = &tracks[0];
        assert_eq!(track.name, "Morning Ride");
        assert_eq!(track.points.len(), 3);
        assert_eq!(track.points[0].lat, 45.0);
        assert_eq!(track.points[0].lon, 7.0);
        assert_eq!(track.points[0].ele, Some(310.5));
        assert_eq!(track.points[0].time.as_deref(), Some("2024-01-01T08:00:00Z"));
        assert_eq!(track.points[1].time, None);
        assert!(track.length_m() > 200.0);
    }

    #[test]
    fn test_unnamed_tracks_numbered_and_empty_dropped() {
        let gpx = wrap(
            r#"<trk><trkseg></trkseg></trk>
               <trk><trkseg><trkpt lat="1.0" lon="1.0"></trkpt></trkseg></trk>"#,
        );
        let tracks = parse_gpx_to_tracks(&gpx).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name, "Track 2");
    }

    #[test]
    fn test_route_fallback() {
        let gpx = wrap(
            r#"<rte>
                 <rtept lat="1.0" lon="2.0"></rtept>
                 <rtept lat="1.001" lon="2.0"></rtept>
               </rte>"#,
        );
        let tracks = parse_gpx_to_tracks(&gpx).unwrap();
        assert_eq!(tracks[0].name, "Route 1");
        assert_eq!(tracks[0].points.len(), 2);
    }

    #[test]
    fn test_no_tracks() {
        assert!(matches!(parse_gpx_to_tracks(&wrap("")), Err(TimingError::NoTracks)));
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(parse_gpx_to_tracks("<gpx"), Err(TimingError::GpxParse(_))));
    }
}
