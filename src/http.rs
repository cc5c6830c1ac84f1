//! HTTP client for Strava activity streams with rate limiting.
//!
//! The caller supplies a valid access token; token exchange and refresh live
//! outside this crate. This module provides:
//! - Connection pooling
//! - Dispatch rate limiting (spaces out request starts)
//! - Parallel fetching with bounded concurrency
//! - Automatic retry with exponential backoff on 429

use log::{debug, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::strava::{points_from_streams, ActivitySummary, StreamSet};
use crate::{TimingError, TrackPoint};

const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";

// Strava allows 200 requests / 15 min by default; two requests per activity
const DISPATCH_INTERVAL_MS: u64 = 250;
const MAX_CONCURRENCY: usize = 8;
const MAX_RETRIES: u32 = 3;

/// An activity's trackpoints, ready for timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTrack {
    pub activity_id: u64,
    pub name: String,
    pub points: Vec<TrackPoint>,
}

/// Dispatch rate limiter - spaces out when requests START.
struct DispatchRateLimiter {
    interval: Duration,
    next_dispatch: Mutex<Instant>,
    dispatched_count: AtomicU32,
    consecutive_429s: AtomicU32,
}

impl DispatchRateLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_dispatch: Mutex::new(Instant::now()),
            dispatched_count: AtomicU32::new(0),
            consecutive_429s: AtomicU32::new(0),
        }
    }

    /// Wait for our dispatch slot. Each caller gets a unique slot
    /// spaced `interval` apart.
    async fn wait_for_dispatch_slot(&self) -> u32 {
        let (wait_duration, dispatch_num) = {
            let mut next = self.next_dispatch.lock().await;
            let now = Instant::now();

            let dispatch_at = if *next > now { *next } else { now };
            *next = dispatch_at + self.interval;

            let num = self.dispatched_count.fetch_add(1, Ordering::Relaxed) + 1;
            (dispatch_at.saturating_duration_since(now), num)
        };

        // Wait outside the lock
        if wait_duration > Duration::from_millis(5) {
            debug!("[Dispatch #{}] Waiting {:?} for slot", dispatch_num, wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        dispatch_num
    }

    fn record_success(&self) {
        self.consecutive_429s.store(0, Ordering::Relaxed);
    }

    fn record_429(&self) -> Duration {
        let count = self.consecutive_429s.fetch_add(1, Ordering::Relaxed) + 1;
        // Exponential backoff: 1s, 2s, 4s, 8s max
        let backoff = Duration::from_millis(1000 * (1 << count.min(4).saturating_sub(1)));
        warn!("[DispatchRateLimiter] Got 429! Consecutive: {}, backing off {:?}", count, backoff);
        backoff
    }
}

/// Fetches activity streams from the Strava API.
pub struct StravaFetcher {
    client: Client,
    auth_header: String,
    base_url: String,
    rate_limiter: Arc<DispatchRateLimiter>,
}

impl StravaFetcher {
    /// Create a fetcher for the given access token.
    pub fn new(access_token: &str) -> Result<Self, TimingError> {
        let client = Client::builder()
            .pool_max_idle_per_host(MAX_CONCURRENCY * 2)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TimingError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth_header: format!("Bearer {}", access_token),
            base_url: STRAVA_API_BASE.to_string(),
            rate_limiter: Arc::new(DispatchRateLimiter::new(Duration::from_millis(DISPATCH_INTERVAL_MS))),
        })
    }

    /// Point the fetcher at another API root (e.g. a local mock).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Fetch one activity and convert its streams into trackpoints.
    pub async fn fetch_activity_track(&self, activity_id: u64) -> Result<ActivityTrack, TimingError> {
        let summary: ActivitySummary = self
            .get_json(&format!("{}/activities/{}", self.base_url, activity_id), &[])
            .await?;
        let streams: StreamSet = self
            .get_json(
                &format!("{}/activities/{}/streams", self.base_url, activity_id),
                &[("keys", "time,latlng,altitude"), ("key_by_type", "true")],
            )
            .await?;

        let points = points_from_streams(summary.start_time()?, &streams);
        debug!("[Strava {}] {} points", activity_id, points.len());

        Ok(ActivityTrack {
            activity_id,
            name: summary.display_name(),
            points,
        })
    }

    /// Fetch many activities in parallel. Results come back in input order.
    pub async fn fetch_activity_tracks(
        &self,
        activity_ids: Vec<u64>,
    ) -> Vec<(u64, Result<ActivityTrack, TimingError>)> {
        use futures::stream::{self, StreamExt};

        let total = activity_ids.len();
        let start = Instant::now();
        info!("[StravaFetcher] Starting fetch of {} activities", total);

        let results: Vec<(u64, Result<ActivityTrack, TimingError>)> = stream::iter(activity_ids)
            .map(|id| async move { (id, self.fetch_activity_track(id).await) })
            .buffered(MAX_CONCURRENCY)
            .collect()
            .await;

        let success_count = results.iter().filter(|(_, r)| r.is_ok()).count();
        info!(
            "[StravaFetcher] DONE: {}/{} success in {:.2}s",
            success_count,
            total,
            start.elapsed().as_secs_f64()
        );

        results
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TimingError> {
        let mut retries = 0;

        loop {
            self.rate_limiter.wait_for_dispatch_slot().await;

            let response = self
                .client
                .get(url)
                .header("Authorization", &self.auth_header)
                .query(query)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        retries += 1;
                        if retries > MAX_RETRIES {
                            return Err(TimingError::Http("Max retries exceeded (429)".to_string()));
                        }
                        let wait = self.rate_limiter.record_429();
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    self.rate_limiter.record_success();

                    if !status.is_success() {
                        return Err(TimingError::Http(format!("HTTP {} for {}", status, url)));
                    }

                    let bytes = resp
                        .bytes()
                        .await
                        .map_err(|e| TimingError::Http(format!("Body download error: {}", e)))?;
                    return serde_json::from_slice(&bytes)
                        .map_err(|e| TimingError::Http(format!("JSON parse error: {}", e)));
                }
                Err(e) => {
                    retries += 1;
                    if retries > MAX_RETRIES {
                        return Err(TimingError::Http(format!("Request error: {}", e)));
                    }

                    let wait = Duration::from_millis(200 * (1 << retries));
                    warn!("[Fetch {}] Error: {}, retry {} after {:?}", url, e, retries, wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
