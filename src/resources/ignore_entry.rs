//! `.gitignore` registration of sync directories.
use anyhow::{Context as _, Result};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use super::{Resource, ResourceChange, ResourceState};

/// Ignore file looked up in the repository root.
pub const IGNORE_FILE: &str = ".gitignore";

/// An entry for a sync directory in the repository's ignore file.
#[derive(Debug, Clone)]
pub struct IgnoreEntryResource {
    /// Path of the ignore file.
    pub ignore_file: PathBuf,
    /// Entry text (`module_a/shared/`), or `None` when the directory lies
    /// outside the repository root.
    pub entry: Option<String>,
}

impl IgnoreEntryResource {
    /// Entry for `target` in the ignore file of the repository at `root`.
    #[must_use]
    pub fn new(root: &Path, target: &Path) -> Self {
        let entry = target.strip_prefix(root).ok().and_then(|rel| {
            let parts: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            (!parts.is_empty()).then(|| format!("{}/", parts.join("/")))
        });
        Self {
            ignore_file: root.join(IGNORE_FILE),
            entry,
        }
    }
}

impl Resource for IgnoreEntryResource {
    fn description(&self) -> String {
        format!(
            "{} in {}",
            self.entry.as_deref().unwrap_or("<outside root>"),
            self.ignore_file.display()
        )
    }

    fn apply(&self) -> Result<ResourceChange> {
        let Some(entry) = &self.entry else {
            return Ok(ResourceChange::Skipped {
                reason: "directory is outside the repository root".to_string(),
            });
        };
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&self.ignore_file)
            .with_context(|| format!("opening {}", self.ignore_file.display()))?;
        write!(
            file,
            "\n\n# directory \"{entry}\" added to {IGNORE_FILE} by molerat\n{entry}"
        )
        .with_context(|| format!("appending to {}", self.ignore_file.display()))?;
        Ok(ResourceChange::Applied)
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.ignore_file.is_file() {
            return Ok(ResourceState::Invalid {
                reason: format!("no {IGNORE_FILE} in repository root"),
            });
        }
        let Some(entry) = &self.entry else {
            return Ok(ResourceState::Invalid {
                reason: "directory is outside the repository root".to_string(),
            });
        };
        let text = std::fs::read_to_string(&self.ignore_file)
            .with_context(|| format!("reading {}", self.ignore_file.display()))?;
        if text.contains(entry.as_str()) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}
