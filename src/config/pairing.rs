//! Resolved watch→destination pairings.
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use super::{DestinationRule, SyncRule};

/// Compiled exclude globs, matched against single path segments.
///
/// Patterns follow shell-glob semantics (`*`, `?`, `[...]`) and are
/// case-insensitive only on Windows. Patterns that fail to compile are
/// dropped here and reported by configuration validation.
#[derive(Debug, Clone)]
pub struct ExcludePatterns {
    patterns: Vec<String>,
    set: GlobSet,
}

impl ExcludePatterns {
    /// Compile `patterns`, skipping any that are not valid globs.
    #[must_use]
    pub fn new(patterns: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            if let Ok(glob) = compile(pattern) {
                builder.add(glob);
                kept.push(pattern.clone());
            }
        }
        let set = builder.build().unwrap_or_else(|_| GlobSet::empty());
        Self {
            patterns: kept,
            set,
        }
    }

    /// An exclude set that matches nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// Returns `true` if the path segment `name` matches any pattern.
    #[must_use]
    pub fn is_excluded(&self, name: &OsStr) -> bool {
        !self.patterns.is_empty() && self.set.is_match(Path::new(name))
    }

    /// The patterns that compiled successfully.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Compile one shell-style glob.
///
/// # Errors
///
/// Returns the glob syntax error for malformed patterns.
pub fn compile(pattern: &str) -> Result<globset::Glob, globset::Error> {
    GlobBuilder::new(pattern)
        .case_insensitive(cfg!(windows))
        .backslash_escape(!cfg!(windows))
        .build()
}

/// One watch directory mirrored into one destination.
#[derive(Debug, Clone)]
pub struct Pairing {
    /// Watch path as written in the configuration.
    pub watch_config: PathBuf,
    /// Absolute watch directory.
    pub watch: PathBuf,
    /// Destination path as written in the configuration.
    pub destination_config: PathBuf,
    /// Absolute destination workspace root.
    pub destination: PathBuf,
    /// Name of the sync directory inside the destination.
    pub sync_dir: PathBuf,
    /// Absolute sync directory: `destination / (directory or basename(watch))`.
    pub target: PathBuf,
    /// Compiled exclude patterns of the owning rule.
    pub excludes: ExcludePatterns,
}

impl Pairing {
    /// Resolve `rule` and `dest` against the repository `root`.
    #[must_use]
    pub fn new(root: &Path, rule: &SyncRule, dest: &DestinationRule) -> Self {
        let watch = root.join(&rule.watch);
        let destination = root.join(&dest.path);
        let sync_dir = dest
            .directory
            .as_deref()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| watch_dir_name(&watch))
            .unwrap_or_default();
        let target = destination.join(&sync_dir);
        Self {
            watch_config: rule.watch.clone(),
            watch,
            destination_config: dest.path.clone(),
            destination,
            sync_dir,
            target,
            excludes: ExcludePatterns::new(rule.excludes()),
        }
    }

    /// Returns `true` if the sync directory is a single plain name, so the
    /// target lies strictly inside the destination.
    #[must_use]
    pub fn has_valid_target(&self) -> bool {
        is_single_segment(&self.sync_dir)
    }

    /// Human-readable label, e.g. `shared -> module_a/shared`.
    #[must_use]
    pub fn name(&self) -> String {
        let target_name = self
            .target
            .file_name()
            .map(|n| self.destination_config.join(n))
            .unwrap_or_else(|| self.destination_config.clone());
        format!(
            "{} -> {}",
            self.watch_config.display(),
            target_name.display()
        )
    }

    /// Path of the mirror for a file at `relative` inside the watch directory.
    #[must_use]
    pub fn mirror_path(&self, relative: &Path) -> PathBuf {
        self.target.join(relative)
    }
}

/// Returns `true` if `path` is exactly one normal component (not empty,
/// `.`, `..`, a root or a nested path).
#[must_use]
pub fn is_single_segment(path: &Path) -> bool {
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Last component of the watch directory, canonicalising paths like `.` or
/// `shared/..` that have no file name of their own.
fn watch_dir_name(watch: &Path) -> Option<PathBuf> {
    watch
        .file_name()
        .filter(|n| *n != OsStr::new(".."))
        .map(PathBuf::from)
        .or_else(|| {
            dunce::canonicalize(watch)
                .ok()
                .and_then(|p| p.file_name().map(PathBuf::from))
        })
}
