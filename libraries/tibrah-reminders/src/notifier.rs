//! Notification output boundary

use crate::error::Result;
use crate::types::Reminder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Notification permission, as granted by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Not asked yet
    #[default]
    Default,
    Granted,
    Denied,
}

/// A notification ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    /// Replaces an earlier notification with the same tag
    pub tag: String,
}

impl Notification {
    pub fn for_reminder(reminder: &Reminder, icon: Option<&str>) -> Self {
        Self {
            title: reminder.title.clone(),
            body: reminder.body.clone(),
            icon: icon.map(str::to_string),
            tag: reminder.id.clone(),
        }
    }
}

/// Native notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Current permission, without prompting
    fn permission(&self) -> Permission;

    /// Prompt for permission; returns the resulting state
    async fn request_permission(&self) -> Permission;

    /// Display a notification
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Notifier that writes notifications to the log
///
/// Permission is a plain flag: granted unless created with
/// [`LogNotifier::denied`].
#[derive(Debug)]
pub struct LogNotifier {
    permission: Mutex<Permission>,
    grant_on_request: bool,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self {
            permission: Mutex::new(Permission::Granted),
            grant_on_request: true,
        }
    }

    /// Notifier whose permission prompt is always refused
    pub fn denied() -> Self {
        Self {
            permission: Mutex::new(Permission::Default),
            grant_on_request: false,
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn request_permission(&self) -> Permission {
        let mut permission = self.permission.lock().unwrap_or_else(PoisonError::into_inner);
        *permission = if self.grant_on_request {
            Permission::Granted
        } else {
            Permission::Denied
        };
        *permission
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            tag = %notification.tag,
            title = %notification.title,
            body = %notification.body,
            "Reminder"
        );
        Ok(())
    }
}
