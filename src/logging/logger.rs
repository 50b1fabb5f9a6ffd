//! Structured logger with summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{Log, SyncEntry, SyncStatus};
use super::utils::{STAGE_TARGET, log_file_path};

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
///
/// The `record_sync` method is **not** included because its signature differs
/// from the `fn(&self, &str)` pattern shared by the display methods.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Production logger backed by [`tracing`].
///
/// Console formatting and the persistent log file at
/// `$XDG_CACHE_HOME/molerat/<command>.log` are handled by the subscriber
/// installed with [`init_subscriber`](super::subscriber::init_subscriber);
/// this type only emits events and keeps the per-pairing summary.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<SyncEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary; the file
    /// itself is created by the subscriber's file layer.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Record a pairing result for the summary.
    pub fn record_sync(&self, name: &str, status: SyncStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(SyncEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Return a clone of all recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<SyncEntry> {
        self.entries.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Count the number of failed pairings.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.entries.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|e| e.status == SyncStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded pairings.
    pub fn print_summary(&self) {
        let entries = self.entries();
        if entries.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut ok = 0u32;
        let mut skipped = 0u32;
        let mut failed = 0u32;

        for entry in &entries {
            let (icon, color) = match entry.status {
                SyncStatus::Ok => {
                    ok += 1;
                    ("✓", "\x1b[32m")
                }
                SyncStatus::Skipped => {
                    skipped += 1;
                    ("○", "\x1b[33m")
                }
                SyncStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = entry
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", entry.name));
        }

        let total = ok + skipped + failed;
        self.info(&format!(
            "{total} pairings: \x1b[32m{ok} ok\x1b[0m, \x1b[33m{skipped} skipped\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error);

    fn record_sync(&self, name: &str, status: SyncStatus, message: Option<&str>) {
        self.record_sync(name, status, message);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn logger_starts_with_no_entries() {
        let log = Logger::new("test");
        assert!(log.entries().is_empty());
        assert_eq!(log.failure_count(), 0);
    }

    #[test]
    fn record_sync_ok() {
        let log = Logger::new("test");
        log.record_sync("shared -> module_a/shared", SyncStatus::Ok, None);
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "shared -> module_a/shared");
        assert_eq!(entries[0].status, SyncStatus::Ok);
        assert!(entries[0].message.is_none());
    }

    #[test]
    fn failure_count_counts_only_failures() {
        let log = Logger::new("test");
        log.record_sync("a", SyncStatus::Ok, None);
        log.record_sync("b", SyncStatus::Failed, Some("copy failed"));
        log.record_sync("c", SyncStatus::Skipped, Some("invalid destination"));
        log.record_sync("d", SyncStatus::Failed, None);
        assert_eq!(log.failure_count(), 2);
    }

    #[test]
    fn logger_is_usable_through_trait_object() {
        let log: Arc<dyn Log> = Arc::new(Logger::new("test"));
        log.info("hello");
        log.record_sync("x", SyncStatus::Ok, None);
    }

    #[test]
    fn concurrent_record_sync_keeps_every_entry() {
        let log = Arc::new(Logger::new("test"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    log.record_sync(&format!("pairing-{i}"), SyncStatus::Ok, None);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(log.entries().len(), 8);
    }
}
