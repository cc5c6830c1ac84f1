//! # Geographic Utilities
//!
//! Proximity and distance helpers used by the timing engine.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two coordinates |
//! | [`within_radius`] | Inclusive "is this point at that target" check |
//! | [`polyline_length`] | Total length of a recorded track in meters |
//! | [`compute_bounds`] | Bounding box of a set of coordinates |
//!
//! ## Example
//!
//! ```rust
//! use gate_timing::{Coordinate, geo_utils};
//!
//! let gate = Coordinate::new(0.0, 0.0);
//! let fix = Coordinate::new(0.0, 0.0003); // ~33m east
//!
//! assert!(geo_utils::within_radius(&fix, &gate, 50.0));
//! assert!(!geo_utils::within_radius(&fix, &gate, 10.0));
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a sphere of radius 6,371,000 m.
//! The radius is fixed here rather than taken from `geo`'s mean-radius
//! constant so that gate hits are reproducible against stored results.

use geo::{BoundingRect, MultiPoint, Point};

use crate::{Bounds, Coordinate, TrackPoint};

/// Mean Earth radius used by every distance in this crate, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two coordinates in meters.
///
/// # Example
///
/// ```rust
/// use gate_timing::{Coordinate, geo_utils};
///
/// let london = Coordinate::new(51.5074, -0.1278);
/// let paris = Coordinate::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_500.0).abs() < 1000.0);
/// ```
#[inline]
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Whether `point` lies within `radius_m` meters of `target`.
///
/// The boundary is inclusive. Coordinates are not range-checked.
#[inline]
pub fn within_radius(point: &Coordinate, target: &Coordinate, radius_m: f64) -> bool {
    haversine_distance(point, target) <= radius_m
}

/// Total length of a recorded track in meters.
///
/// Sums the haversine distance between consecutive points. Empty or
/// single-point tracks return 0.0.
pub fn polyline_length(points: &[TrackPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0].coordinate(), &w[1].coordinate()))
        .sum()
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Bounding box of a set of coordinates, or `None` for empty input.
///
/// ```rust
/// use gate_timing::{Coordinate, geo_utils};
///
/// let bounds = geo_utils::compute_bounds(&[
///     Coordinate::new(51.50, -0.13),
///     Coordinate::new(51.51, -0.12),
/// ]).unwrap();
/// assert_eq!(bounds.min_lat, 51.50);
/// assert_eq!(bounds.max_lng, -0.12);
/// ```
pub fn compute_bounds(coords: &[Coordinate]) -> Option<Bounds> {
    let multi: MultiPoint<f64> = coords
        .iter()
        .map(|c| Point::new(c.lon, c.lat))
        .collect::<Vec<_>>()
        .into();

    multi.bounding_rect().map(|rect| Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = Coordinate::new(51.5074, -0.1278);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_distance_equator_milli_degree() {
        // 0.001 degrees of longitude at the equator on a 6,371 km sphere
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 0.001);
        let expected = EARTH_RADIUS_M * 0.001_f64.to_radians();
        assert!(approx_eq(haversine_distance(&a, &b), expected, 1e-6));
        assert!(approx_eq(expected, 111.195, 0.001));
    }

    #[test]
    fn test_haversine_distance_symmetric() {
        let a = Coordinate::new(45.0, 7.0);
        let b = Coordinate::new(45.01, 7.02);
        assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
    }

    #[test]
    fn test_within_radius_boundary_inclusive() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 0.001);
        let d = haversine_distance(&a, &b);
        assert!(within_radius(&b, &a, d));
        assert!(!within_radius(&b, &a, d - 0.001));
    }

    #[test]
    fn test_polyline_length() {
        let track = vec![
            TrackPoint::new(0.0, 0.0),
            TrackPoint::new(0.0, 0.001),
            TrackPoint::new(0.0, 0.002),
        ];
        assert!(approx_eq(polyline_length(&track), 222.39, 0.01));
        assert_eq!(polyline_length(&track[..1]), 0.0);
    }

    #[test]
    fn test_compute_bounds() {
        let coords = vec![
            Coordinate::new(51.50, -0.13),
            Coordinate::new(51.51, -0.12),
            Coordinate::new(51.505, -0.125),
        ];
        let bounds = compute_bounds(&coords).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);
    }

    #[test]
    fn test_compute_bounds_empty() {
        assert!(compute_bounds(&[]).is_none());
    }
}
