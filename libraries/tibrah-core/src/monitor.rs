//! Error monitoring
//!
//! Keeps a bounded, de-duplicated log of errors seen by the application.
//! Identical errors (same message and context) collapse into one report with
//! a running count. The log can be spilled to and restored from a
//! [`LocalStore`] so it survives restarts.

use crate::error::Result;
use crate::storage::LocalStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;

/// Store key for the spilled error log
pub const ERROR_LOG_KEY: &str = "tibrah_error_log";

/// Default number of distinct reports kept
const DEFAULT_CAPACITY: usize = 50;

/// One distinct error and how often it occurred
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// SHA-256 hex digest of message + context
    pub hash: String,
    pub message: String,
    pub context: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub count: u32,
}

/// Bounded, de-duplicating error log
#[derive(Debug)]
pub struct ErrorMonitor {
    reports: VecDeque<ErrorReport>,
    capacity: usize,
}

impl ErrorMonitor {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Keep at most `capacity` distinct reports (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            reports: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Restore a previously flushed log
    ///
    /// Reports beyond `capacity` are dropped oldest-first.
    pub fn load(store: &LocalStore, capacity: usize) -> Result<Self> {
        let mut monitor = Self::with_capacity(capacity);
        if let Some(reports) = store.get::<Vec<ErrorReport>>(ERROR_LOG_KEY)? {
            for report in reports {
                monitor.push(report);
            }
        }
        Ok(monitor)
    }

    /// Record an occurrence, returning the (possibly merged) report
    pub fn record(&mut self, message: impl Into<String>, context: Option<&str>) -> &ErrorReport {
        self.record_at(message, context, Utc::now())
    }

    /// Same as [`record`](Self::record) with an explicit timestamp
    pub fn record_at(
        &mut self,
        message: impl Into<String>,
        context: Option<&str>,
        now: DateTime<Utc>,
    ) -> &ErrorReport {
        let message = message.into();
        let hash = fingerprint(&message, context);

        let existing = self
            .reports
            .iter()
            .position(|r| r.hash == hash)
            .and_then(|index| self.reports.remove(index));

        let report = match existing {
            Some(mut report) => {
                report.count = report.count.saturating_add(1);
                report.last_seen = now;
                tracing::debug!(hash = %report.hash, count = report.count, "Repeated error");
                report
            }
            None => {
                tracing::warn!(hash = %hash, context = ?context, "{}", message);
                ErrorReport {
                    hash,
                    message,
                    context: context.map(str::to_string),
                    first_seen: now,
                    last_seen: now,
                    count: 1,
                }
            }
        };

        // Re-pushing moves a repeated report to the back, so eviction drops
        // the least recently seen
        self.push(report);
        &self.reports[self.reports.len() - 1]
    }

    /// Reports, least recently seen first
    pub fn reports(&self) -> impl Iterator<Item = &ErrorReport> {
        self.reports.iter()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn clear(&mut self) {
        self.reports.clear();
    }

    /// Spill the whole log to `store`
    pub fn flush(&self, store: &LocalStore) -> Result<()> {
        let reports: Vec<&ErrorReport> = self.reports.iter().collect();
        store.set(ERROR_LOG_KEY, &reports)
    }

    fn push(&mut self, report: ErrorReport) {
        while self.reports.len() >= self.capacity {
            self.reports.pop_front();
        }
        self.reports.push_back(report);
    }
}

impl Default for ErrorMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 of message and context; persisted, so it must not depend on the
/// toolchain
fn fingerprint(message: &str, context: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hasher.update([0u8]);
    if let Some(context) = context {
        hasher.update([1u8]);
        hasher.update(context.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn duplicates_collapse() {
        let mut monitor = ErrorMonitor::new();
        let t0 = Utc::now();

        monitor.record_at("fetch failed", Some("shop"), t0);
        let report = monitor
            .record_at("fetch failed", Some("shop"), t0 + Duration::seconds(5))
            .clone();

        assert_eq!(monitor.len(), 1);
        assert_eq!(report.count, 2);
        assert_eq!(report.first_seen, t0);
        assert_eq!(report.last_seen, t0 + Duration::seconds(5));
    }

    #[test]
    fn context_distinguishes_reports() {
        let mut monitor = ErrorMonitor::new();
        monitor.record("fetch failed", Some("shop"));
        monitor.record("fetch failed", Some("courses"));
        monitor.record("fetch failed", None);

        assert_eq!(monitor.len(), 3);
    }

    #[test]
    fn evicts_least_recently_seen() {
        let mut monitor = ErrorMonitor::with_capacity(2);
        monitor.record("a", None);
        monitor.record("b", None);
        // Touch "a" so "b" becomes the oldest
        monitor.record("a", None);
        monitor.record("c", None);

        let messages: Vec<&str> = monitor.reports().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "c"]);
    }

    #[test]
    fn fingerprint_is_stable() {
        assert_eq!(
            fingerprint("fetch failed", Some("shop")),
            "d3bbc539b99e257298e799d520ba9d8a19236b0863578cd471c7eaa4ab4794b3"
        );
        assert_eq!(
            fingerprint("fetch failed", None),
            "77b15f7607267becbac23bffaf5d132dbf0062c2503fe64cfa51af34a553ecf2"
        );
        assert_ne!(fingerprint("fetch failed", Some("")), fingerprint("fetch failed", None));
    }

    #[test]
    fn report_from_an_older_log_merges() {
        let store = LocalStore::in_memory();
        let earlier = Utc::now() - Duration::days(3);
        let persisted = ErrorReport {
            hash: fingerprint("quota exceeded", Some("storage")),
            message: "quota exceeded".into(),
            context: Some("storage".into()),
            first_seen: earlier,
            last_seen: earlier,
            count: 4,
        };
        store.set(ERROR_LOG_KEY, &vec![persisted]).unwrap();

        let mut monitor = ErrorMonitor::load(&store, 10).unwrap();
        let report = monitor.record("quota exceeded", Some("storage")).clone();
        assert_eq!(monitor.len(), 1);
        assert_eq!(report.count, 5);
        assert_eq!(report.first_seen, earlier);
    }

    #[test]
    fn flush_and_load() {
        let store = LocalStore::in_memory();
        let mut monitor = ErrorMonitor::new();
        monitor.record("quota exceeded", Some("storage"));
        monitor.record("quota exceeded", Some("storage"));
        monitor.flush(&store).unwrap();

        let restored = ErrorMonitor::load(&store, 10).unwrap();
        let report = restored.reports().next().unwrap();
        assert_eq!(report.message, "quota exceeded");
        assert_eq!(report.count, 2);
    }
}
