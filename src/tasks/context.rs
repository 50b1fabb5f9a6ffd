//! Shared state handed to every task and watch thread.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Configuration, Pairing};
use crate::deps::ManifestPromoter;
use crate::logging::Log;

/// Shared context for task execution and live watching.
pub struct Context {
    /// Loaded configuration; never mutated during a run.
    pub config: Arc<Configuration>,
    /// Repository root all relative paths are resolved against.
    pub root: PathBuf,
    /// Logger for output and pairing results.
    pub log: Arc<dyn Log>,
    /// Dependency promoter shared by every pairing.
    pub promoter: Arc<ManifestPromoter>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("root", &self.root)
            .field("log", &"<dyn Log>")
            .field("promoter", &self.promoter)
            .finish()
    }
}

impl Context {
    /// Creates a new context.
    #[must_use]
    pub fn new(
        config: Arc<Configuration>,
        root: &Path,
        log: Arc<dyn Log>,
        promoter: Arc<ManifestPromoter>,
    ) -> Self {
        Self {
            config,
            root: root.to_path_buf(),
            log,
            promoter,
        }
    }

    /// Every (rule, destination) pairing, in configuration order.
    #[must_use]
    pub fn pairings(&self) -> Vec<Pairing> {
        self.config.pairings(&self.root)
    }
}
