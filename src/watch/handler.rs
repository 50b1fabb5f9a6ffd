//! Per-pairing handling of live file events.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use anyhow::{Context as _, Result};

use super::signal::StopSignal;
use super::source::{EventStream, FileEvent, FileEventKind};
use crate::config::Pairing;
use crate::deps::ManifestPromoter;
use crate::logging::Log;
use crate::resources::mirror::MirrorFileResource;
use crate::resources::{self, ResourceChange};

/// How long a watch thread blocks on its stream before rechecking the stop
/// flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle of one pairing's watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Created, not yet receiving events.
    Idle,
    /// Waiting for the next event.
    Watching,
    /// Mirroring an event.
    Applying,
    /// Terminal; the stream is no longer read.
    Stopped,
}

/// What handling a single event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The file was copied into the sync directory.
    Mirrored(PathBuf),
    /// The mirror already matched its source; only promotion ran.
    UpToDate(PathBuf),
    /// The mirrored copy was removed.
    Removed(PathBuf),
    /// Nothing needed doing or the event does not concern this pairing.
    Ignored,
    /// The event could not be applied; the reason is reported.
    Skipped(String),
}

/// Applies the events of one pairing to its sync directory.
pub struct PairingHandler {
    pairing: Pairing,
    canonical_watch: Option<PathBuf>,
    log: Arc<dyn Log>,
    promoter: Arc<ManifestPromoter>,
    state: WatchState,
}

impl std::fmt::Debug for PairingHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairingHandler")
            .field("pairing", &self.pairing.name())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl PairingHandler {
    /// Create an idle handler for `pairing`.
    #[must_use]
    pub fn new(pairing: Pairing, log: Arc<dyn Log>, promoter: Arc<ManifestPromoter>) -> Self {
        let canonical_watch = dunce::canonicalize(&pairing.watch).ok();
        Self {
            pairing,
            canonical_watch,
            log,
            promoter,
            state: WatchState::Idle,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> WatchState {
        self.state
    }

    /// The pairing this handler applies events to.
    #[must_use]
    pub const fn pairing(&self) -> &Pairing {
        &self.pairing
    }

    /// Consume `events` until `stop` is raised or the stream disconnects.
    ///
    /// An event already received when `stop` is raised is applied before
    /// returning. Returns the number of events handled.
    pub fn run(&mut self, events: &EventStream, stop: &StopSignal) -> usize {
        self.state = WatchState::Watching;
        let mut handled = 0;
        while !stop.is_raised() {
            match events.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(event)) => {
                    self.state = WatchState::Applying;
                    if let Err(e) = self.handle(&event) {
                        self.log.error(&format!("{}: {e:#}", self.pairing.name()));
                    }
                    handled += 1;
                    self.state = WatchState::Watching;
                }
                Ok(Err(e)) => self.log.warn(&format!("{}: {e}", self.pairing.name())),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.log.debug(&format!(
                        "{}: event stream closed",
                        self.pairing.name()
                    ));
                    break;
                }
            }
        }
        self.state = WatchState::Stopped;
        handled
    }

    /// Apply one event to the sync directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the mirrored file cannot be written or removed,
    /// or if promoting the file's dependencies fails.
    pub fn handle(&self, event: &FileEvent) -> Result<EventOutcome> {
        let Some(relative) = self.relative_path(&event.path) else {
            self.log.debug(&format!(
                "ignoring {}: outside {}",
                event.path.display(),
                self.pairing.watch.display()
            ));
            return Ok(EventOutcome::Ignored);
        };
        let mirror = MirrorFileResource::new(
            event.path.clone(),
            self.pairing.mirror_path(&relative),
        );

        match event.kind {
            FileEventKind::Created | FileEventKind::Modified => self.mirror(&mirror),
            FileEventKind::Deleted => self.unmirror(&mirror),
        }
    }

    fn mirror(&self, mirror: &MirrorFileResource) -> Result<EventOutcome> {
        let outcome = match resources::reconcile(mirror)? {
            ResourceChange::Skipped { .. } if mirror.source.is_dir() => {
                return Ok(EventOutcome::Ignored);
            }
            ResourceChange::Skipped { reason } => {
                self.log.warn(&format!("skipped {}: {reason}", mirror.source.display()));
                return Ok(EventOutcome::Skipped(reason));
            }
            ResourceChange::AlreadyCorrect => {
                self.log
                    .debug(&format!("{} already up to date", mirror.target.display()));
                EventOutcome::UpToDate(mirror.target.clone())
            }
            ResourceChange::Applied => {
                self.log.info(&format!(
                    "{} >> {}",
                    mirror.source.display(),
                    mirror.target.display()
                ));
                EventOutcome::Mirrored(mirror.target.clone())
            }
        };

        self.promoter
            .promote(&mirror.source, &self.pairing.destination, false)
            .with_context(|| {
                format!(
                    "promoting dependencies of {} into {}",
                    mirror.source.display(),
                    self.pairing.destination.display()
                )
            })?;
        Ok(outcome)
    }

    fn unmirror(&self, mirror: &MirrorFileResource) -> Result<EventOutcome> {
        match mirror.remove()? {
            ResourceChange::Applied => {
                self.log
                    .info(&format!("deleted {}", mirror.target.display()));
                Ok(EventOutcome::Removed(mirror.target.clone()))
            }
            ResourceChange::AlreadyCorrect => Ok(EventOutcome::Ignored),
            ResourceChange::Skipped { reason } => {
                self.log.debug(&format!("not deleting: {reason}"));
                Ok(EventOutcome::Ignored)
            }
        }
    }

    /// Path of `path` relative to the watch directory, trying the configured
    /// and the canonical spelling of the directory.
    fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        let relative = path.strip_prefix(&self.pairing.watch).ok().or_else(|| {
            self.canonical_watch
                .as_deref()
                .and_then(|watch| path.strip_prefix(watch).ok())
        })?;
        (!relative.as_os_str().is_empty()).then(|| relative.to_path_buf())
    }
}
