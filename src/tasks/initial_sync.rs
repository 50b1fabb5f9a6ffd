//! Initial full sync of one pairing.
use anyhow::{Context as _, Result};

use super::{Context, Task, TaskResult};
use crate::config::Pairing;
use crate::deps::PromotionOutcome;
use crate::error::SyncError;
use crate::resources::ignore_entry::IgnoreEntryResource;
use crate::resources::sync_dir::SyncDirResource;
use crate::resources::{self, Resource as _, ResourceChange};

/// Full copy of one watch directory into one destination, followed by
/// ignore-file registration and dependency promotion.
#[derive(Debug)]
pub struct SyncPairing {
    pairing: Pairing,
}

impl SyncPairing {
    /// Task for `pairing`.
    #[must_use]
    pub const fn new(pairing: Pairing) -> Self {
        Self { pairing }
    }

    fn register_ignore_entry(&self, ctx: &Context) -> Result<()> {
        let entry = IgnoreEntryResource::new(&ctx.root, &self.pairing.target);
        match resources::reconcile(&entry)? {
            ResourceChange::Applied => {
                ctx.log.info(&format!("added {}", entry.description()));
            }
            ResourceChange::Skipped { reason } => {
                ctx.log.debug(&format!("not registering ignore entry: {reason}"));
            }
            ResourceChange::AlreadyCorrect => {}
        }
        Ok(())
    }
}

impl Task for SyncPairing {
    fn name(&self) -> String {
        self.pairing.name()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let p = &self.pairing;

        if !p.watch.is_dir() {
            return Ok(TaskResult::Skipped(
                SyncError::InvalidWatchPath {
                    path: p.watch.clone(),
                }
                .to_string(),
            ));
        }
        if !p.destination.is_dir() {
            return Ok(TaskResult::Skipped(
                SyncError::InvalidDestinationPath {
                    path: p.destination.clone(),
                }
                .to_string(),
            ));
        }
        if !p.has_valid_target() {
            return Ok(TaskResult::Skipped(
                SyncError::InvalidDestinationPath {
                    path: p.target.clone(),
                }
                .to_string(),
            ));
        }

        let sync_dir = SyncDirResource::from_pairing(p);
        let stats = sync_dir
            .sync()
            .with_context(|| format!("syncing {}", sync_dir.description()))?;
        ctx.log.info(&format!(
            "copied {} file(s) to {}",
            stats.files,
            p.target.display()
        ));
        if stats.excluded > 0 {
            ctx.log
                .debug(&format!("{} entries excluded", stats.excluded));
        }
        if stats.dangling > 0 {
            ctx.log.warn(&format!(
                "skipped {} dangling symlink(s) in {}",
                stats.dangling,
                p.watch.display()
            ));
        }

        self.register_ignore_entry(ctx)?;

        match ctx
            .promoter
            .promote(&p.watch, &p.destination, true)
            .with_context(|| format!("promoting dependencies into {}", p.destination.display()))?
        {
            PromotionOutcome::Promoted { .. } => {}
            PromotionOutcome::RootManifestMissing(path)
            | PromotionOutcome::DestinationManifestMissing(path) => {
                ctx.log
                    .debug(&format!("promotion skipped: {} not found", path.display()));
            }
        }

        Ok(TaskResult::Ok)
    }
}
