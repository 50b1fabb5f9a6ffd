//! In-memory reporting sink for silent runs and assertions.
use std::sync::Mutex;

use super::types::{Log, SyncEntry, SyncStatus};

/// Severity of a captured message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Stage header.
    Stage,
    /// Informational message.
    Info,
    /// Debug message.
    Debug,
    /// Warning.
    Warn,
    /// Error.
    Error,
}

/// A [`Log`] that records every message instead of printing it.
#[derive(Debug, Default)]
pub struct MemoryLog {
    messages: Mutex<Vec<(Level, String)>>,
    entries: Mutex<Vec<SyncEntry>>,
}

impl MemoryLog {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: Level, msg: &str) {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((level, msg.to_string()));
    }

    /// All captured messages in emission order.
    #[must_use]
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Returns `true` if a message at `level` contains `needle`.
    #[must_use]
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    /// All recorded pairing results.
    #[must_use]
    pub fn entries(&self) -> Vec<SyncEntry> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Log for MemoryLog {
    fn stage(&self, msg: &str) {
        self.push(Level::Stage, msg);
    }

    fn info(&self, msg: &str) {
        self.push(Level::Info, msg);
    }

    fn debug(&self, msg: &str) {
        self.push(Level::Debug, msg);
    }

    fn warn(&self, msg: &str) {
        self.push(Level::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.push(Level::Error, msg);
    }

    fn record_sync(&self, name: &str, status: SyncStatus, message: Option<&str>) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(SyncEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn captures_messages_in_order() {
        let log = MemoryLog::new();
        log.stage("Initial sync");
        log.warn("skipping");
        log.info("done");
        let messages = log.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], (Level::Stage, "Initial sync".to_string()));
        assert_eq!(messages[1].0, Level::Warn);
    }

    #[test]
    fn contains_matches_level_and_substring() {
        let log = MemoryLog::new();
        log.warn("root doesn't contain pyproject.toml");
        assert!(log.contains(Level::Warn, "pyproject.toml"));
        assert!(!log.contains(Level::Error, "pyproject.toml"));
    }

    #[test]
    fn records_sync_entries() {
        let log = MemoryLog::new();
        log.record_sync("a -> b", SyncStatus::Skipped, Some("invalid"));
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, SyncStatus::Skipped);
    }
}
