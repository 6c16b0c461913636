//! Subcommand implementations

pub mod audio;
pub mod reminders;

use crate::config::TibrahConfig;
use crate::error::Result;
use std::sync::Arc;
use tibrah_core::{ErrorMonitor, LocalStore};

/// Number of distinct errors kept in the persisted log
pub const ERROR_LOG_CAPACITY: usize = 50;

/// Open the data directory from the configuration
pub fn open_store(config: &TibrahConfig) -> Result<Arc<LocalStore>> {
    Ok(Arc::new(LocalStore::open(&config.storage.data_dir)?))
}

/// Record a failed command in the persisted error log
pub fn record_error(store: &LocalStore, message: &str, command: &str) -> Result<()> {
    let mut monitor = ErrorMonitor::load(store, ERROR_LOG_CAPACITY)?;
    let report = monitor.record(message, Some(command));
    tracing::debug!(hash = %report.hash, count = report.count, "Error recorded");
    monitor.flush(store)?;
    Ok(())
}

pub fn print_errors(store: &LocalStore, clear: bool) -> Result<()> {
    let mut monitor = ErrorMonitor::load(store, ERROR_LOG_CAPACITY)?;
    if monitor.is_empty() {
        println!("No errors recorded");
    }
    for report in monitor.reports() {
        println!(
            "{} x{} [{}] {}",
            report.last_seen.format("%Y-%m-%d %H:%M:%S"),
            report.count,
            report.context.as_deref().unwrap_or("-"),
            report.message
        );
    }
    if clear {
        monitor.clear();
        monitor.flush(store)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_deduplicated_in_the_log() {
        let store = LocalStore::in_memory();
        record_error(&store, "device busy", "tone").unwrap();
        record_error(&store, "device busy", "tone").unwrap();
        record_error(&store, "not found", "reminders").unwrap();

        let monitor = ErrorMonitor::load(&store, ERROR_LOG_CAPACITY).unwrap();
        assert_eq!(monitor.len(), 2);
        let busy = monitor
            .reports()
            .find(|r| r.message == "device busy")
            .unwrap();
        assert_eq!(busy.count, 2);
        assert_eq!(busy.context.as_deref(), Some("tone"));

        print_errors(&store, true).unwrap();
        assert!(ErrorMonitor::load(&store, ERROR_LOG_CAPACITY).unwrap().is_empty());
    }
}
