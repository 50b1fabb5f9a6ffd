//! File-system targets that molerat keeps in step with the watch
//! directories: the whole sync directory, single mirrored files, and the
//! ignore-file entry of each sync directory.
pub mod fs;
pub mod ignore_entry;
pub mod mirror;
pub mod sync_dir;

use anyhow::Result;

/// What a mirrored file or ignore entry looks like on disk right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Not there yet.
    Missing,
    /// Already matches its source.
    Correct,
    /// Present but stale.
    Incorrect {
        /// What differs.
        current: String,
    },
    /// Cannot be brought up to date, e.g. the watched file vanished or
    /// the repository has no `.gitignore`.
    Invalid {
        /// Why not.
        reason: String,
    },
}

/// What [`reconcile`] (or a removal) did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// The file or entry was written or deleted.
    Applied,
    /// It already matched; nothing was touched.
    AlreadyCorrect,
    /// Left alone, with the reason.
    Skipped {
        /// Why it was left alone.
        reason: String,
    },
}

/// A target that can inspect itself and be brought up to date.
pub trait Resource {
    /// Short label for log lines.
    fn description(&self) -> String;

    /// Inspect the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the source or target cannot be read.
    fn current_state(&self) -> Result<ResourceState>;

    /// Write the target unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be written.
    fn apply(&self) -> Result<ResourceChange>;
}

/// Apply `resource` only if it is missing or stale.
///
/// # Errors
///
/// Returns an error if inspecting or writing the target fails.
pub fn reconcile(resource: &dyn Resource) -> Result<ResourceChange> {
    match resource.current_state()? {
        ResourceState::Missing | ResourceState::Incorrect { .. } => resource.apply(),
        ResourceState::Correct => Ok(ResourceChange::AlreadyCorrect),
        ResourceState::Invalid { reason } => Ok(ResourceChange::Skipped { reason }),
    }
}
