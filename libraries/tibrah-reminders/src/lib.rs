//! Tibrah Reminders
//!
//! Daily and weekday reminders (medication, water, meals, ...) that fire a
//! native notification once per day at their `HH:MM`.
//!
//! - [`ReminderStore`]: the reminder list, persisted under
//!   [`REMINDERS_KEY`] in a [`LocalStore`](tibrah_core::LocalStore)
//! - [`ReminderSchedule`]: fired-today bookkeeping and next-fire computation
//! - [`Notifier`]: the notification boundary
//! - [`ReminderService`]: the tokio loop tying them together
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tibrah_core::LocalStore;
//! use tibrah_reminders::{LogNotifier, Reminder, ReminderKind, ReminderService, ReminderStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tibrah_reminders::Result<()> {
//! let store = ReminderStore::new(Arc::new(LocalStore::in_memory()));
//! store.add(Reminder::new(ReminderKind::Water, "Drink water", "10:00".parse()?))?;
//!
//! let service = ReminderService::new(store, Arc::new(LogNotifier::new()));
//! service.request_permission().await?;
//! let handle = service.spawn();
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod notifier;
pub mod schedule;
pub mod service;
pub mod store;
pub mod types;

pub use error::{ReminderError, Result};
pub use notifier::{LogNotifier, Notification, Notifier, Permission};
pub use schedule::{next_fire, upcoming, ReminderSchedule};
pub use service::{Clock, ReminderService, ReminderServiceHandle, SystemClock, MAX_SLEEP};
pub use store::{ReminderStore, REMINDERS_KEY};
pub use types::{weekday_number, Reminder, ReminderKind, ReminderTime};
