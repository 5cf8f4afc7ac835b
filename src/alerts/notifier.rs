//! The boundary between notification state and whatever surface shows it

use crate::error::NotificationError;
use crate::events::{Severity, Timestamp};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

/// A user-visible notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub body: String,
    pub created_at: Timestamp,
}

/// Surface that displays notifications
///
/// The notification center decides *whether* and *when* a notification is
/// shown; implementations of this trait only show it.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError>;
}

impl std::fmt::Debug for dyn Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Notifier")
    }
}

/// Notifier that writes notifications to the application log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        match notification.severity {
            Severity::Critical => error!("{}: {}", notification.title, notification.body),
            Severity::High => warn!("{}: {}", notification.title, notification.body),
            _ => info!("{}: {}", notification.title, notification.body),
        }
        Ok(())
    }
}
