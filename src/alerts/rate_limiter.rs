use crate::events::Timestamp;
use chrono::Duration;
use std::collections::VecDeque;

/// Rate limiter for preventing notification spam
///
/// Tracks recent deliveries and enforces a maximum rate per sliding minute.
/// Callers pass the current time in so the window follows the pipeline's
/// clock rather than the wall clock.
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum number of notifications allowed per minute
    max_per_minute: usize,
    /// Timestamps of recent notifications
    recent_notifications: VecDeque<Timestamp>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(3) // Default: 3 notifications per minute
    }
}

impl RateLimiter {
    /// Create a new rate limiter with the specified maximum notifications per minute
    pub fn new(max_per_minute: usize) -> Self {
        Self {
            max_per_minute,
            recent_notifications: VecDeque::new(),
        }
    }

    /// Check whether a notification can be sent at `now` without exceeding the limit
    pub fn can_send_at(&mut self, now: Timestamp) -> bool {
        self.cleanup_old_notifications(now);
        self.recent_notifications.len() < self.max_per_minute
    }

    /// Record that a notification was sent at `now`
    pub fn record_at(&mut self, now: Timestamp) {
        self.recent_notifications.push_back(now);
        self.cleanup_old_notifications(now);
    }

    /// Number of notifications sent in the minute ending at `now`
    pub fn count_at(&mut self, now: Timestamp) -> usize {
        self.cleanup_old_notifications(now);
        self.recent_notifications.len()
    }

    /// Remove notifications older than one minute before `now`
    fn cleanup_old_notifications(&mut self, now: Timestamp) {
        let cutoff = now - Duration::minutes(1);
        self.recent_notifications.retain(|&time| time > cutoff);
    }
}
