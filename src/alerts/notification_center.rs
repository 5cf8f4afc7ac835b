use crate::alerts::{Notification, Notifier, RateLimiter};
use crate::clock::Clock;
use crate::error::NotificationError;
use crate::events::Severity;
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::sync::Arc;

const MAX_TITLE_LENGTH: usize = 256;
const MAX_BODY_LENGTH: usize = 1024;

/// Gatekeeper for user-visible notifications
///
/// The NotificationCenter drops notifications below the configured minimum
/// severity, rate limits the rest, and queues what the rate limit holds back.
/// Queued notifications are delivered on the next submission or on `tick()`,
/// which callers should invoke periodically so the queue drains even when no
/// new notifications arrive.
#[derive(Debug)]
pub struct NotificationCenter {
    /// Surface the notifications are shown on
    notifier: Arc<dyn Notifier>,
    /// Rate limiter to prevent notification spam
    rate_limiter: RateLimiter,
    /// Notifications held back by the rate limiter
    queue: VecDeque<Notification>,
    /// Maximum size of the queue
    max_queue_size: usize,
    /// Notifications below this severity are dropped
    min_severity: Severity,
    clock: Arc<dyn Clock>,
}

impl NotificationCenter {
    /// Create a notification center with default limits
    /// (3 per minute, queue of 100, every severity shown)
    pub fn new(notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            notifier,
            rate_limiter: RateLimiter::new(3),
            queue: VecDeque::new(),
            max_queue_size: 100,
            min_severity: Severity::Low,
            clock,
        }
    }

    pub fn with_rate_limit(mut self, max_per_minute: usize) -> Self {
        self.rate_limiter = RateLimiter::new(max_per_minute);
        self
    }

    pub fn with_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    /// Submit a notification for delivery
    ///
    /// Returns `Ok(())` when the notification was shown, queued or dropped by
    /// the severity gate.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the notifier fails to show it.
    pub fn submit(&mut self, notification: Notification) -> Result<(), NotificationError> {
        // First, deliver whatever the rate limit now allows from the queue
        self.process_queued()?;

        if !notification.severity.at_least(self.min_severity) {
            debug!(
                "Dropping {} notification below minimum severity: {}",
                notification.severity, notification.title
            );
            return Ok(());
        }

        if self.rate_limiter.can_send_at(self.clock.now()) {
            self.send_now(&notification)
        } else {
            info!("Queued notification due to rate limit: {}", notification.title);
            self.enqueue(notification);
            Ok(())
        }
    }

    /// Deliver queued notifications if rate limiting allows
    ///
    /// Returns the number of notifications delivered.
    pub fn tick(&mut self) -> Result<usize, NotificationError> {
        let initial = self.queue.len();
        self.process_queued()?;
        let processed = initial - self.queue.len();

        if processed > 0 {
            info!("Processed {} queued notifications", processed);
        }
        Ok(processed)
    }

    /// Get the current number of queued notifications
    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    fn process_queued(&mut self) -> Result<(), NotificationError> {
        while !self.queue.is_empty() && self.rate_limiter.can_send_at(self.clock.now()) {
            if let Some(queued) = self.queue.pop_front() {
                self.send_now(&queued)?;
            }
        }
        Ok(())
    }

    fn enqueue(&mut self, notification: Notification) {
        if self.max_queue_size == 0 {
            warn!("Notification queue disabled, dropping: {}", notification.title);
            return;
        }
        if self.queue.len() >= self.max_queue_size {
            if let Some(dropped) = self.queue.pop_front() {
                warn!("Notification queue full, dropping oldest: {}", dropped.title);
            }
        }
        self.queue.push_back(notification);
    }

    /// Show a notification immediately (assumes the rate limit check passed)
    fn send_now(&mut self, notification: &Notification) -> Result<(), NotificationError> {
        let shown = Notification {
            title: truncate_text(&notification.title, MAX_TITLE_LENGTH),
            body: truncate_text(&notification.body, MAX_BODY_LENGTH),
            ..notification.clone()
        };

        match self.notifier.notify(&shown) {
            Ok(()) => {
                self.rate_limiter.record_at(self.clock.now());
                Ok(())
            }
            Err(e) => {
                error!("Failed to send notification '{}': {}", shown.title, e);
                Err(e)
            }
        }
    }
}

/// Truncate text to at most `max_length` bytes, ending in `...`
///
/// Cuts on a UTF-8 character boundary so multi-byte text never panics.
fn truncate_text(text: &str, max_length: usize) -> String {
    if text.len() <= max_length {
        return text.to_string();
    }

    let mut truncate_at = max_length.saturating_sub(3);
    while truncate_at > 0 && !text.is_char_boundary(truncate_at) {
        truncate_at -= 1;
    }
    format!("{}...", &text[..truncate_at])
}
