//! File-system helpers shared by the mirroring resources.
use anyhow::{Context as _, Result};
use std::path::Path;

use crate::config::ExcludePatterns;

/// Counters for one recursive copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Files copied.
    pub files: usize,
    /// Entries skipped because they matched an exclude pattern.
    pub excluded: usize,
    /// Symlinks skipped because their target does not exist.
    pub dangling: usize,
}

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// Remove the file or symlink at `path`. Does nothing if it does not exist.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_existing(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            Err(e).with_context(|| format!("remove existing: {}", path.display()))
        }
        _ => Ok(()),
    }
}

/// Make `path` an empty directory, removing whatever was there first.
///
/// # Errors
///
/// Returns an error if the old contents cannot be removed or the directory
/// cannot be created.
pub fn recreate_dir(path: &Path) -> Result<()> {
    match path.symlink_metadata() {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path)
            .with_context(|| format!("removing directory {}", path.display()))?,
        Ok(_) => remove_existing(path)?,
        Err(_) => {}
    }
    std::fs::create_dir_all(path).with_context(|| format!("creating directory {}", path.display()))
}

/// Recursively copy a directory tree, skipping excluded entries.
///
/// `excludes` is matched against the name of every file and directory at
/// every level; an excluded directory is not descended into. Symlinks are
/// followed and their content copied. Dangling symlinks are skipped.
///
/// # Errors
///
/// Returns an error if the destination directory cannot be created, a source
/// entry cannot be read, or a file cannot be copied.
pub fn copy_dir_filtered(src: &Path, dst: &Path, excludes: &ExcludePatterns) -> Result<CopyStats> {
    let mut stats = CopyStats::default();
    copy_into(src, dst, excludes, &mut stats)?;
    Ok(stats)
}

fn copy_into(src: &Path, dst: &Path, excludes: &ExcludePatterns, stats: &mut CopyStats) -> Result<()> {
    std::fs::create_dir_all(dst)
        .with_context(|| format!("creating directory {}", dst.display()))?;

    let mut entries = std::fs::read_dir(src)
        .with_context(|| format!("reading directory {}", src.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("reading entry in {}", src.display()))?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let name = entry.file_name();
        if excludes.is_excluded(&name) {
            stats.excluded += 1;
            continue;
        }
        let src_path = entry.path();
        let dst_path = dst.join(&name);

        // `metadata` follows symlinks; failure on a symlink means it dangles.
        let meta = match std::fs::metadata(&src_path) {
            Ok(meta) => meta,
            Err(_) if src_path.symlink_metadata().is_ok_and(|m| m.is_symlink()) => {
                stats.dangling += 1;
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", src_path.display()));
            }
        };

        if meta.is_dir() {
            copy_into(&src_path, &dst_path, excludes, stats)?;
        } else {
            std::fs::copy(&src_path, &dst_path).with_context(|| {
                format!("copying {} to {}", src_path.display(), dst_path.display())
            })?;
            stats.files += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn patterns(list: &[&str]) -> ExcludePatterns {
        ExcludePatterns::new(&list.iter().map(ToString::to_string).collect::<Vec<_>>())
    }

    #[test]
    fn copies_files_and_subdirectories() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        std::fs::write(src.path().join("a.py"), b"aaa").unwrap();
        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/b.py"), b"bbb").unwrap();

        let target = dst.path().join("out");
        let stats = copy_dir_filtered(src.path(), &target, &ExcludePatterns::empty()).unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(std::fs::read(target.join("a.py")).unwrap(), b"aaa");
        assert_eq!(std::fs::read(target.join("sub/b.py")).unwrap(), b"bbb");
    }

    #[test]
    fn excluded_names_are_skipped_at_every_level() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        std::fs::write(src.path().join("util.py"), "").unwrap();
        std::fs::write(src.path().join("skipme.py"), "").unwrap();
        std::fs::create_dir_all(src.path().join("pkg/__pycache__")).unwrap();
        std::fs::write(src.path().join("pkg/__pycache__/x.pyc"), "").unwrap();
        std::fs::write(src.path().join("pkg/skipme.py"), "").unwrap();
        std::fs::write(src.path().join("pkg/mod.py"), "").unwrap();

        let target = dst.path().join("out");
        let stats =
            copy_dir_filtered(src.path(), &target, &patterns(&["skipme.py", "__pycache__"])).unwrap();

        assert!(target.join("util.py").exists());
        assert!(target.join("pkg/mod.py").exists());
        assert!(!target.join("skipme.py").exists());
        assert!(!target.join("pkg/skipme.py").exists());
        assert!(!target.join("pkg/__pycache__").exists());
        assert_eq!(stats.excluded, 3);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlinks_are_skipped() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("real.py"), "x").unwrap();
        std::os::unix::fs::symlink("/nonexistent/target", src.path().join("broken.py")).unwrap();
        std::os::unix::fs::symlink(src.path().join("real.py"), src.path().join("alias.py"))
            .unwrap();

        let target = dst.path().join("out");
        let stats = copy_dir_filtered(src.path(), &target, &ExcludePatterns::empty()).unwrap();

        assert_eq!(stats.dangling, 1);
        assert!(!target.join("broken.py").exists());
        assert_eq!(std::fs::read_to_string(target.join("alias.py")).unwrap(), "x");
        assert!(!target.join("alias.py").symlink_metadata().unwrap().is_symlink());
    }

    #[test]
    fn recreate_dir_clears_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("shared");
        std::fs::create_dir_all(target.join("stale")).unwrap();
        std::fs::write(target.join("old.py"), "").unwrap();

        recreate_dir(&target).unwrap();

        assert!(target.is_dir());
        assert_eq!(std::fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn recreate_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/shared");
        recreate_dir(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn recreate_dir_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("shared");
        std::fs::write(&target, "not a dir").unwrap();
        recreate_dir(&target).unwrap();
        assert!(target.is_dir());
    }

    // -----------------------------------------------------------------------
    // ensure_parent_dir
    // -----------------------------------------------------------------------

    #[test]
    fn ensure_parent_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("file.txt");
        ensure_parent_dir(&nested).unwrap();
        assert!(dir.path().join("a").join("b").exists());
    }

    // -----------------------------------------------------------------------
    // remove_existing
    // -----------------------------------------------------------------------

    #[test]
    fn remove_existing_removes_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("target");
        std::fs::write(&file, "content").unwrap();
        remove_existing(&file).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn remove_existing_noop_when_path_absent() {
        let dir = tempfile::tempdir().unwrap();
        remove_existing(&dir.path().join("nonexistent")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn remove_existing_removes_broken_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("/nonexistent/target", &link).unwrap();
        remove_existing(&link).unwrap();
        assert!(link.symlink_metadata().is_err());
    }
}
