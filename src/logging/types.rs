//! Core logging types: sync entries, status, and the [`Log`] trait.

/// Outcome of one watch→destination pairing, kept for the run summary.
#[derive(Debug, Clone)]
pub struct SyncEntry {
    /// Human-readable pairing name (`watch -> target`).
    pub name: String,
    /// Final status of the pairing.
    pub status: SyncStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a completed pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// The pairing was synchronised.
    Ok,
    /// The pairing was skipped because a path was invalid.
    Skipped,
    /// The pairing failed part way through.
    Failed,
}

/// Injected reporting sink.
///
/// Every component receives an `Arc<dyn Log>` instead of reaching for a
/// global console, so tests can run silently against a
/// [`MemoryLog`](super::MemoryLog) while the binary uses
/// [`Logger`](super::Logger).
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record a pairing result for the summary.
    fn record_sync(&self, name: &str, status: SyncStatus, message: Option<&str>);
}
