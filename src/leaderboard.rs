//! Per-course leaderboards.
//!
//! A submission is timed over every gate of its course. If any gate comes
//! back `"N/A"` the track did not complete the course and the submission is
//! rejected. Otherwise the segment seconds are summed and the rider keeps
//! whichever of their old and new totals is lower.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::TimingConfig;
use crate::course::Course;
use crate::{SegmentResult, TimingError, TrackPoint};

/// Longest username kept on an entry, in characters.
pub const MAX_USERNAME_CHARS: usize = 40;

/// A track submitted for a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub points: Vec<TrackPoint>,
}

/// One rider's best result on a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: u64,
    pub course_id: u64,
    pub username: String,
    pub total_time_sec: i64,
    pub segments: Vec<SegmentResult>,
    pub created_at: DateTime<Utc>,
}

/// Time `points` over `course` and total the result.
///
/// Fails with [`TimingError::IncompleteCourse`] when any gate has no crossing.
/// Gates whose checkpoints were missed still count towards the total.
pub fn evaluate_track(
    course: &Course,
    points: &[TrackPoint],
    config: &TimingConfig,
) -> Result<(Vec<SegmentResult>, i64), TimingError> {
    let segments = course.segment_times(points, config);

    let mut total = 0;
    for segment in &segments {
        match segment.time_sec.seconds() {
            Some(seconds) => total += seconds,
            None => return Err(TimingError::IncompleteCourse { segments }),
        }
    }

    Ok((segments, total))
}

fn normalize_username(raw: &str) -> Result<String, TimingError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TimingError::MissingUsername);
    }
    Ok(trimmed.chars().take(MAX_USERNAME_CHARS).collect())
}

/// In-memory courses and their best entries.
#[derive(Debug, Default)]
pub struct Leaderboard {
    courses: HashMap<u64, Course>,
    entries: HashMap<u64, Vec<LeaderboardEntry>>,
    next_entry_id: u64,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a course. Replacing a course keeps its entries.
    pub fn add_course(&mut self, course: Course) {
        self.courses.insert(course.id, course);
    }

    pub fn course(&self, course_id: u64) -> Option<&Course> {
        self.courses.get(&course_id)
    }

    /// Remove a course together with its entries.
    pub fn remove_course(&mut self, course_id: u64) -> Option<Course> {
        self.entries.remove(&course_id);
        self.courses.remove(&course_id)
    }

    /// Submit a track to a course's leaderboard.
    ///
    /// Returns the rider's entry after the submission: the new one if it set
    /// a strictly lower total (or the rider had none), otherwise the
    /// existing entry unchanged.
    pub fn submit(
        &mut self,
        course_id: u64,
        submission: &Submission,
        config: &TimingConfig,
    ) -> Result<LeaderboardEntry, TimingError> {
        let course = self
            .courses
            .get(&course_id)
            .ok_or(TimingError::CourseNotFound(course_id))?;

        let username = normalize_username(&submission.username)?;
        if submission.points.is_empty() {
            return Err(TimingError::NoPoints);
        }

        let (segments, total) = evaluate_track(course, &submission.points, config)?;

        let entries = self.entries.entry(course_id).or_default();
        if let Some(existing) = entries.iter_mut().find(|e| e.username == username) {
            if total < existing.total_time_sec {
                info!(
                    "[Leaderboard] course {}: {} improved {}s -> {}s",
                    course_id, username, existing.total_time_sec, total
                );
                existing.total_time_sec = total;
                existing.segments = segments;
                existing.created_at = Utc::now();
            }
            return Ok(existing.clone());
        }

        self.next_entry_id += 1;
        let entry = LeaderboardEntry {
            id: self.next_entry_id,
            course_id,
            username,
            total_time_sec: total,
            segments,
            created_at: Utc::now(),
        };
        info!(
            "[Leaderboard] course {}: new entry for {} at {}s",
            course_id, entry.username, total
        );
        entries.push(entry.clone());

        Ok(entry)
    }

    /// Entries for a course, fastest first.
    pub fn standings(&self, course_id: u64) -> Vec<LeaderboardEntry> {
        let mut entries = self.entries.get(&course_id).cloned().unwrap_or_default();
        entries.sort_by(|a, b| {
            a.total_time_sec
                .cmp(&b.total_time_sec)
                .then(a.created_at.cmp(&b.created_at))
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SegmentTime;
    use serde_json::json;

    fn course() -> Course {
        let body = json!({
            "name": "Ridge",
            "buffer_m": 50,
            "gates": [
                {"pairId": 1, "start": {"lat": 0, "lon": 0}, "end": {"lat": 0, "lon": 0.001}},
                {"pairId": 2, "name": "Climb", "start": {"lat": 0, "lon": 0.001}, "end": {"lat": 0, "lon": 0.002},
                 "checkpoints": [{"lat": 1.0, "lon": 1.0}]}
            ]
        });
        Course::from_json(1, &body, &TimingConfig::default()).unwrap()
    }

    fn ride(username: &str, seg1: &str, seg2: &str) -> Submission {
        Submission {
            username: username.to_string(),
            points: vec![
                TrackPoint::timed(0.0, 0.0, "2024-01-01T00:00:00Z"),
                TrackPoint::timed(0.0, 0.001, seg1),
                TrackPoint::timed(0.0, 0.002, seg2),
            ],
        }
    }

    fn board() -> Leaderboard {
        let mut board = Leaderboard::new();
        board.add_course(course());
        board
    }

    #[test]
    fn test_submit_totals_segments() {
        let mut board = board();
        let entry = board
            .submit(1, &ride("ana", "2024-01-01T00:01:00Z", "2024-01-01T00:03:00Z"), &TimingConfig::default())
            .unwrap();
        assert_eq!(entry.total_time_sec, 180);
        assert_eq!(entry.segments.len(), 2);
        assert_eq!(entry.segments[1].segment, "Climb");
        // Missed checkpoint does not block the submission
        assert!(!entry.segments[1].valid);
    }

    #[test]
    fn test_incomplete_track_rejected() {
        let mut board = board();
        let mut submission = ride("ana", "2024-01-01T00:01:00Z", "2024-01-01T00:03:00Z");
        submission.points.pop();
        match board.submit(1, &submission, &TimingConfig::default()) {
            Err(TimingError::IncompleteCourse { segments }) => {
                assert_eq!(segments[1].time_sec, SegmentTime::Unresolved);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(board.standings(1).is_empty());
    }

    #[test]
    fn test_keeps_best_total() {
        let mut board = board();
        let config = TimingConfig::default();
        board.submit(1, &ride("ana", "2024-01-01T00:01:00Z", "2024-01-01T00:03:00Z"), &config).unwrap();

        let slower = board
            .submit(1, &ride("ana", "2024-01-01T00:02:00Z", "2024-01-01T00:05:00Z"), &config)
            .unwrap();
        assert_eq!(slower.total_time_sec, 180);

        let faster = board
            .submit(1, &ride("  ana ", "2024-01-01T00:01:00Z", "2024-01-01T00:02:00Z"), &config)
            .unwrap();
        assert_eq!(faster.total_time_sec, 120);
        assert_eq!(faster.id, slower.id);
        assert_eq!(board.standings(1).len(), 1);
    }

    #[test]
    fn test_standings_sorted() {
        let mut board = board();
        let config = TimingConfig::default();
        board.submit(1, &ride("slow", "2024-01-01T00:02:00Z", "2024-01-01T00:05:00Z"), &config).unwrap();
        board.submit(1, &ride("fast", "2024-01-01T00:01:00Z", "2024-01-01T00:02:00Z"), &config).unwrap();
        let names: Vec<String> = board.standings(1).into_iter().map(|e| e.username).collect();
        assert_eq!(names, vec!["fast", "slow"]);
    }

    #[test]
    fn test_submission_validation() {
        let mut board = board();
        let config = TimingConfig::default();
        let ok = ride("ana", "2024-01-01T00:01:00Z", "2024-01-01T00:03:00Z");

        assert!(matches!(board.submit(9, &ok, &config), Err(TimingError::CourseNotFound(9))));
        assert!(matches!(
            board.submit(1, &Submission { username: "   ".into(), points: ok.points.clone() }, &config),
            Err(TimingError::MissingUsername)
        ));
        assert!(matches!(
            board.submit(1, &Submission { username: "ana".into(), points: vec![] }, &config),
            Err(TimingError::NoPoints)
        ));
    }

    #[test]
    fn test_username_truncated() {
        let mut board = board();
        let long = "x".repeat(60);
        let entry = board
            .submit(1, &ride(&long, "2024-01-01T00:01:00Z", "2024-01-01T00:03:00Z"), &TimingConfig::default())
            .unwrap();
        assert_eq!(entry.username.chars().count(), MAX_USERNAME_CHARS);
    }

    #[test]
    fn test_remove_course_drops_entries() {
        let mut board = board();
        board
            .submit(1, &ride("ana", "2024-01-01T00:01:00Z", "2024-01-01T00:03:00Z"), &TimingConfig::default())
            .unwrap();
        assert!(board.remove_course(1).is_some());
        assert!(board.course(1).is_none());
        assert!(board.standings(1).is_empty());
    }
}
