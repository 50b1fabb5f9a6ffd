//! Single mirrored file.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::{Resource, ResourceChange, ResourceState};

/// A file in a watch directory and its copy inside a sync directory.
#[derive(Debug, Clone)]
pub struct MirrorFileResource {
    /// File inside the watch directory.
    pub source: PathBuf,
    /// Mirrored path inside the sync directory.
    pub target: PathBuf,
}

impl MirrorFileResource {
    /// Create a new mirror resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }

    /// Delete the mirrored file. A mirror that is already gone is not an
    /// error, and a directory at the mirrored path is left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be deleted.
    pub fn remove(&self) -> Result<ResourceChange> {
        match self.target.symlink_metadata() {
            Err(_) => Ok(ResourceChange::AlreadyCorrect),
            Ok(meta) if meta.is_dir() => Ok(ResourceChange::Skipped {
                reason: format!("{} is a directory", self.target.display()),
            }),
            Ok(_) => {
                super::fs::remove_existing(&self.target)?;
                Ok(ResourceChange::Applied)
            }
        }
    }
}

impl Resource for MirrorFileResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.source.display(), self.target.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        super::fs::ensure_parent_dir(&self.target)?;
        std::fs::copy(&self.source, &self.target).with_context(|| {
            format!(
                "copying {} to {}",
                self.source.display(),
                self.target.display()
            )
        })?;
        Ok(ResourceChange::Applied)
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.source.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: format!("{} is a directory", self.source.display()),
            });
        }
        if !self.source.is_file() {
            return Ok(ResourceState::Invalid {
                reason: format!("{} no longer exists", self.source.display()),
            });
        }
        if !self.target.exists() {
            return Ok(ResourceState::Missing);
        }
        if self.target.is_dir() {
            return Ok(ResourceState::Incorrect {
                current: "target is a directory".to_string(),
            });
        }

        let source = std::fs::read(&self.source)
            .with_context(|| format!("reading {}", self.source.display()))?;
        let target = std::fs::read(&self.target)
            .with_context(|| format!("reading {}", self.target.display()))?;
        if source == target {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: "content differs".to_string(),
            })
        }
    }
}
