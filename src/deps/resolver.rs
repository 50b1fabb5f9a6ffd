//! Package → distribution resolution with a process-wide cache.
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use rayon::prelude::*;

use super::imports::ImportScanner;
use super::site_packages::DistributionLookup;
use crate::error::{ResolveError, ScanError};
use crate::logging::Log;

/// Resolves the distributions used by Python sources.
///
/// Shared by every pairing. Lookups are memoised per package name; once a
/// package resolves (including to "absent") it is never looked up again for
/// the lifetime of the resolver. Concurrent callers may race to look up the
/// same package, but the first result inserted is the one every caller sees.
pub struct DistributionResolver {
    lookup: Arc<dyn DistributionLookup>,
    cache: RwLock<HashMap<String, Option<String>>>,
    log: Arc<dyn Log>,
}

impl std::fmt::Debug for DistributionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributionResolver")
            .field("cached", &self.cache_len())
            .finish_non_exhaustive()
    }
}

impl DistributionResolver {
    /// Create a resolver over `lookup` with an empty cache.
    #[must_use]
    pub fn new(lookup: Arc<dyn DistributionLookup>, log: Arc<dyn Log>) -> Self {
        Self {
            lookup,
            cache: RwLock::new(HashMap::new()),
            log,
        }
    }

    /// Sorted, deduplicated distributions used by the source at `path`.
    ///
    /// With `is_directory`, every `*.py` file below `path` is scanned in
    /// parallel; files that cannot be read or parsed are reported and
    /// skipped. Otherwise `path` is scanned as a single file, and a file that
    /// is not Python source uses no distributions.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotADirectory`] if `is_directory` is set and
    /// `path` is not a directory, and [`ResolveError::Scan`] if the Python
    /// grammar cannot be loaded.
    pub fn resolve(&self, path: &Path, is_directory: bool) -> Result<Vec<String>, ResolveError> {
        let packages = if is_directory {
            if !path.is_dir() {
                return Err(ResolveError::NotADirectory {
                    path: path.to_path_buf(),
                });
            }
            self.scan_directory(path)?
        } else {
            self.scan_single(path)?
        };

        let distributions: BTreeSet<String> = packages
            .iter()
            .filter_map(|package| self.distribution(package))
            .collect();
        self.log.debug(&format!(
            "{}: {} package(s), {} distribution(s)",
            path.display(),
            packages.len(),
            distributions.len()
        ));
        Ok(distributions.into_iter().collect())
    }

    /// Number of package names resolved so far.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Cached distribution for `package`, looking it up on first use.
    fn distribution(&self, package: &str) -> Option<String> {
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(package)
        {
            return hit.clone();
        }

        let found = self.lookup.distribution_for(package).unwrap_or_else(|e| {
            self.log.debug(&format!("{e}; treating '{package}' as not installed"));
            None
        });

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(package.to_string())
            .or_insert(found)
            .clone()
    }

    fn scan_single(&self, path: &Path) -> Result<BTreeSet<String>, ResolveError> {
        if path.extension().is_none_or(|ext| ext != "py") {
            return Ok(BTreeSet::new());
        }
        let mut scanner = ImportScanner::new()?;
        match scanner.scan_file(path) {
            Ok(packages) => Ok(packages),
            Err(e @ (ScanError::Parse { .. } | ScanError::Io { .. })) => {
                self.log.warn(&format!("skipping {}: {e}", path.display()));
                Ok(BTreeSet::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn scan_directory(&self, dir: &Path) -> Result<BTreeSet<String>, ResolveError> {
        let files = self.python_files(dir);

        let results: Vec<(&PathBuf, Result<BTreeSet<String>, ScanError>)> = files
            .par_iter()
            .map_init(ImportScanner::new, |scanner, file| {
                let result = match scanner {
                    Ok(scanner) => scanner.scan_file(file),
                    Err(e) => Err(ScanError::Grammar(e.to_string())),
                };
                (file, result)
            })
            .collect();

        let mut packages = BTreeSet::new();
        for (file, result) in results {
            match result {
                Ok(found) => packages.extend(found),
                Err(e @ (ScanError::Parse { .. } | ScanError::Io { .. })) => {
                    self.log.warn(&format!("skipping {}: {e}", file.display()));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(packages)
    }

    /// Every `*.py` file below `dir`, in a stable order.
    fn python_files(&self, dir: &Path) -> Vec<PathBuf> {
        walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    self.log.warn(&format!("skipping unreadable entry: {e}"));
                    None
                }
            })
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "py")
            })
            .map(walkdir::DirEntry::into_path)
            .collect()
    }
}
