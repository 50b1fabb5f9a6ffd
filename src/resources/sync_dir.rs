//! Whole sync directory, rebuilt from its watch directory.
use anyhow::Result;
use std::path::PathBuf;

use super::fs::{CopyStats, copy_dir_filtered, recreate_dir};
use crate::config::{ExcludePatterns, Pairing};

/// The sync directory of one pairing.
///
/// Applying it discards the current contents of `target` and copies the
/// watch directory back in, honouring the rule's exclude patterns.
#[derive(Debug, Clone)]
pub struct SyncDirResource {
    /// Watch directory.
    pub source: PathBuf,
    /// Sync directory inside the destination.
    pub target: PathBuf,
    /// Names never copied.
    pub excludes: ExcludePatterns,
}

impl SyncDirResource {
    /// Resource for the sync directory of `pairing`.
    #[must_use]
    pub fn from_pairing(pairing: &Pairing) -> Self {
        Self {
            source: pairing.watch.clone(),
            target: pairing.target.clone(),
            excludes: pairing.excludes.clone(),
        }
    }

    /// Short label for log lines.
    #[must_use]
    pub fn description(&self) -> String {
        format!("{} -> {}", self.source.display(), self.target.display())
    }

    /// Recreate the sync directory and copy the watch directory into it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be recreated or any entry
    /// cannot be copied. The sync directory may be partially filled.
    pub fn sync(&self) -> Result<CopyStats> {
        recreate_dir(&self.target)?;
        copy_dir_filtered(&self.source, &self.target, &self.excludes)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::test_helpers::single_rule;

    #[test]
    fn sync_replaces_stale_contents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("shared")).unwrap();
        std::fs::write(root.join("shared/util.py"), "import math\n").unwrap();
        std::fs::write(root.join("shared/skipme.py"), "print('skip')\n").unwrap();
        std::fs::create_dir_all(root.join("module_a/shared")).unwrap();
        std::fs::write(root.join("module_a/shared/stale.py"), "").unwrap();

        let config = single_rule("shared", &["skipme.py"], "module_a", None);
        let pairing = config.pairings(root).remove(0);
        let res = SyncDirResource::from_pairing(&pairing);
        let stats = res.sync().unwrap();

        assert_eq!(stats.files, 1);
        assert_eq!(stats.excluded, 1);
        assert!(root.join("module_a/shared/util.py").exists());
        assert!(!root.join("module_a/shared/skipme.py").exists());
        assert!(!root.join("module_a/shared/stale.py").exists());
    }

    #[test]
    fn sync_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        let res = SyncDirResource {
            source: src,
            target: dir.path().join("dst/deep/src"),
            excludes: ExcludePatterns::empty(),
        };
        assert_eq!(res.sync().unwrap().files, 0);
        assert!(res.target.is_dir());
        assert!(res.description().contains("dst"));
    }

    #[test]
    fn missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let res = SyncDirResource {
            source: dir.path().join("missing"),
            target: dir.path().join("out"),
            excludes: ExcludePatterns::empty(),
        };
        assert!(res.sync().is_err());
    }
}
