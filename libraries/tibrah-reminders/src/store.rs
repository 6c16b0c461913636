//! Reminder persistence
//!
//! All reminders live as one JSON list under [`REMINDERS_KEY`]. Every read
//! loads the whole list and every mutation rewrites it.

use crate::error::{ReminderError, Result};
use crate::types::Reminder;
use std::sync::Arc;
use tibrah_core::LocalStore;
use tokio::sync::Notify;

/// Local store key holding the reminder list
pub const REMINDERS_KEY: &str = "tibrah_reminders";

/// Reminder list on top of a [`LocalStore`]
///
/// Cloning shares the store and the change signal. Each successful mutation
/// wakes the scheduler so it can recompute its next fire time.
#[derive(Clone)]
pub struct ReminderStore {
    store: Arc<LocalStore>,
    changed: Arc<Notify>,
}

impl ReminderStore {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            store,
            changed: Arc::new(Notify::new()),
        }
    }

    /// Signal raised after every mutation
    pub fn changes(&self) -> Arc<Notify> {
        Arc::clone(&self.changed)
    }

    pub fn list(&self) -> Result<Vec<Reminder>> {
        Ok(self.store.get(REMINDERS_KEY)?.unwrap_or_default())
    }

    pub fn get(&self, id: &str) -> Result<Reminder> {
        self.list()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ReminderError::NotFound(id.to_string()))
    }

    /// Append a reminder; an id already in the list is replaced
    pub fn add(&self, reminder: Reminder) -> Result<Reminder> {
        reminder.validate()?;
        let mut reminders = self.list()?;
        reminders.retain(|r| r.id != reminder.id);
        reminders.push(reminder.clone());
        self.save(&reminders)?;

        tracing::info!(id = %reminder.id, time = %reminder.time, kind = %reminder.kind, "Reminder added");
        Ok(reminder)
    }

    /// Replace the reminder with the same id
    pub fn update(&self, reminder: Reminder) -> Result<()> {
        reminder.validate()?;
        let mut reminders = self.list()?;
        let slot = reminders
            .iter_mut()
            .find(|r| r.id == reminder.id)
            .ok_or_else(|| ReminderError::NotFound(reminder.id.clone()))?;
        *slot = reminder;
        self.save(&reminders)
    }

    /// Flip `enabled`; returns the new value
    pub fn toggle(&self, id: &str) -> Result<bool> {
        let mut reminders = self.list()?;
        let reminder = reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ReminderError::NotFound(id.to_string()))?;
        reminder.enabled = !reminder.enabled;
        let enabled = reminder.enabled;

        self.save(&reminders)?;
        tracing::info!(id, enabled, "Reminder toggled");
        Ok(enabled)
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        let mut reminders = self.list()?;
        let before = reminders.len();
        reminders.retain(|r| r.id != id);
        if reminders.len() == before {
            return Err(ReminderError::NotFound(id.to_string()));
        }

        self.save(&reminders)?;
        tracing::info!(id, "Reminder removed");
        Ok(())
    }

    fn save(&self, reminders: &[Reminder]) -> Result<()> {
        self.store.set(REMINDERS_KEY, reminders)?;
        // Stores a permit if the scheduler is not waiting yet
        self.changed.notify_one();
        Ok(())
    }
}

impl std::fmt::Debug for ReminderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderStore")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
