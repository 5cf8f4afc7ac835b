/// Notification gating, rate limiting and delivery surfaces
pub mod notification_center;
pub mod notifier;
pub mod rate_limiter;

pub use notification_center::NotificationCenter;
#[cfg(test)]
pub use notifier::MockNotifier;
pub use notifier::{LogNotifier, Notification, Notifier};
pub use rate_limiter::RateLimiter;
