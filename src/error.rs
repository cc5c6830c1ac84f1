//! Error type shared by the request, course, leaderboard and import layers.
//!
//! The timing engine itself is infallible: a gate that cannot be timed is
//! reported as [`SegmentTime::Unresolved`](crate::SegmentTime::Unresolved).
//! Errors are reserved for caller bugs (malformed gates) and for the outer
//! layers that reject whole requests.

use thiserror::Error;

use crate::SegmentResult;

#[derive(Error, Debug)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error), uniffi(flat_error))]
pub enum TimingError {
    #[error("invalid gate at index {index}: {reason}")]
    InvalidGate { index: usize, reason: String },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("invalid buffer radius: {0}")]
    InvalidBuffer(f64),
    #[error("too many track points: {count} (max {max})")]
    TooManyPoints { count: usize, max: usize },
    #[error("too many gates: {count} (max {max})")]
    TooManyGates { count: usize, max: usize },
    #[error("track does not complete the course (N/A present)")]
    IncompleteCourse { segments: Vec<SegmentResult> },
    #[error("username required")]
    MissingUsername,
    #[error("no track points provided")]
    NoPoints,
    #[error("course not found: {0}")]
    CourseNotFound(u64),
    #[error("failed to parse GPX: {0}")]
    GpxParse(String),
    #[error("no valid tracks or routes found in GPX")]
    NoTracks,
    #[error("http error: {0}")]
    Http(String),
}

impl From<serde_json::Error> for TimingError {
    fn from(err: serde_json::Error) -> Self {
        TimingError::InvalidPayload(err.to_string())
    }
}
