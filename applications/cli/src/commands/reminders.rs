//! Reminder management and the reminder loop

use crate::error::Result;
use std::future::Future;
use std::sync::Arc;
use tibrah_reminders::{
    LogNotifier, Notifier, Reminder, ReminderKind, ReminderService, ReminderStore, ReminderTime,
};

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// One-line listing: `id  [on] 07:00 medication  Pills (Mon,Wed)`
pub fn format_reminder(reminder: &Reminder) -> String {
    let days = if reminder.days.is_empty() {
        "daily".to_string()
    } else {
        reminder
            .days
            .iter()
            .filter_map(|&day| DAY_NAMES.get(usize::from(day)).copied())
            .collect::<Vec<_>>()
            .join(",")
    };
    let state = if reminder.enabled { "on" } else { "off" };
    format!(
        "{}  [{state}] {} {:<11} {} ({days})",
        reminder.id,
        reminder.time,
        reminder.kind.as_str(),
        reminder.title
    )
}

pub fn list(store: &ReminderStore, json: bool) -> Result<()> {
    let reminders = store.list()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&reminders)?);
        return Ok(());
    }
    if reminders.is_empty() {
        println!("No reminders");
    }
    for reminder in &reminders {
        println!("{}", format_reminder(reminder));
    }
    Ok(())
}

pub fn add(
    store: &ReminderStore,
    kind: ReminderKind,
    title: String,
    time: ReminderTime,
    body: String,
    days: Vec<u8>,
) -> Result<Reminder> {
    let reminder = Reminder::new(kind, title, time)
        .with_body(body)
        .with_days(days)?;
    Ok(store.add(reminder)?)
}

/// Fire reminders through the log until `interrupt` resolves
pub async fn run<F>(store: ReminderStore, icon: Option<String>, interrupt: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    run_with(store, Arc::new(LogNotifier::new()), icon, interrupt).await
}

pub async fn run_with<F>(
    store: ReminderStore,
    notifier: Arc<dyn Notifier>,
    icon: Option<String>,
    interrupt: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let service = ReminderService::new(store, notifier).with_icon(icon);
    service.request_permission().await?;

    let handle = service.spawn();
    interrupt.await;
    handle.shutdown().await;
    Ok(())
}
