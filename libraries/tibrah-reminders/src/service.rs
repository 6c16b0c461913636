//! Reminder service loop
//!
//! Wakes at the next fire time, the next midnight, or when the reminder list
//! changes, whichever comes first, then fires what is due. No sleep lasts
//! longer than [`MAX_SLEEP`]: other processes may edit the list, and the
//! wall clock can jump (DST, NTP) while tokio's clock does not.

use crate::error::{ReminderError, Result};
use crate::notifier::{Notification, Notifier, Permission};
use crate::schedule::ReminderSchedule;
use crate::store::ReminderStore;
use crate::types::Reminder;
use chrono::NaiveDateTime;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Longest the loop sleeps before re-reading the list and the clock
pub const MAX_SLEEP: Duration = Duration::from_secs(60);

/// Source of local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The machine's local time zone
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Fires reminders through a [`Notifier`]
pub struct ReminderService {
    store: ReminderStore,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    icon: Option<String>,
    schedule: ReminderSchedule,
}

impl ReminderService {
    pub fn new(store: ReminderStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            clock: Arc::new(SystemClock),
            icon: None,
            schedule: ReminderSchedule::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Icon attached to every notification
    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    /// Ask for notification permission unless already granted
    pub async fn request_permission(&self) -> Result<()> {
        if self.notifier.permission() == Permission::Granted {
            return Ok(());
        }
        match self.notifier.request_permission().await {
            Permission::Granted => Ok(()),
            other => Err(ReminderError::PermissionDenied(format!(
                "notification permission is {other:?}"
            ))),
        }
    }

    /// Fire everything due now; returns the fired reminders and the next wake time
    ///
    /// Without notification permission nothing fires and nothing is marked.
    pub async fn tick(&mut self) -> Result<(Vec<Reminder>, NaiveDateTime)> {
        let now = self.clock.now();
        let reminders = self.store.list()?;

        let mut fired = Vec::new();
        if self.notifier.permission() == Permission::Granted {
            for reminder in self.schedule.check(&reminders, now) {
                let notification = Notification::for_reminder(&reminder, self.icon.as_deref());
                match self.notifier.notify(&notification).await {
                    Ok(()) => tracing::debug!(id = %reminder.id, "Reminder fired"),
                    Err(e) => tracing::warn!(id = %reminder.id, error = %e, "Reminder notification failed"),
                }
                fired.push(reminder);
            }
        }

        Ok((fired, self.schedule.next_wake(&reminders, now)))
    }

    /// Run until `shutdown` resolves
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let changes = self.store.changes();
        tokio::pin!(shutdown);

        tracing::info!("Reminder service started");
        loop {
            let delay = match self.tick().await {
                Ok((_, wake)) => {
                    let until_wake = (wake - self.clock.now()).to_std().unwrap_or_default();
                    tracing::trace!(delay = ?until_wake, %wake, "Next reminder wake");
                    until_wake.min(MAX_SLEEP)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Reminder check failed");
                    MAX_SLEEP
                }
            };

            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(delay) => {}
                () = changes.notified() => tracing::debug!("Reminders changed"),
            }
        }
        tracing::info!("Reminder service stopped");
    }

    /// Run on the current tokio runtime
    pub fn spawn(self) -> ReminderServiceHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(self.run(async move {
            // Sender dropped counts as shutdown
            shutdown_rx.await.ok();
        }));
        ReminderServiceHandle { shutdown_tx, task }
    }
}

/// Running reminder service
pub struct ReminderServiceHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ReminderServiceHandle {
    /// Stop the loop and wait for it to finish
    pub async fn shutdown(self) {
        self.shutdown_tx.send(()).ok();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Reminder service task failed");
        }
    }
}
