//! Error types for reminders

use thiserror::Error;
use tibrah_core::TibrahError;

/// Reminder errors
#[derive(Debug, Error)]
pub enum ReminderError {
    /// Time is not a valid `HH:MM`
    #[error("Invalid reminder time '{0}' (expected HH:MM)")]
    InvalidTime(String),

    /// Weekday outside 0 (Sunday) ..= 6 (Saturday)
    #[error("Invalid weekday {0} (expected 0-6, 0 = Sunday)")]
    InvalidWeekday(u8),

    /// Unknown reminder kind name
    #[error("Unknown reminder type '{0}'")]
    InvalidKind(String),

    #[error("Reminder not found: {0}")]
    NotFound(String),

    /// Notification permission not granted
    #[error("Notification permission denied: {0}")]
    PermissionDenied(String),

    /// Delivery to the notification system failed
    #[error("Notification failed: {0}")]
    Notification(String),

    #[error(transparent)]
    Store(#[from] TibrahError),
}

impl ReminderError {
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }
}

/// Result type for reminder operations
pub type Result<T> = std::result::Result<T, ReminderError>;
