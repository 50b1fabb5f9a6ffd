//! Promotion of root dependencies into destination manifests.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::manifest::{DestinationManifest, MANIFEST_FILE, RootManifest};
use super::resolver::DistributionResolver;
use crate::error::ManifestError;
use crate::logging::Log;

/// What a promotion did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionOutcome {
    /// The destination manifest was rewritten.
    Promoted {
        /// Entries newly appended to `project.dependencies`.
        dependencies: usize,
        /// Entries newly appended to `dependency-groups.dev`.
        dev: usize,
    },
    /// No manifest at the repository root; nothing was done.
    RootManifestMissing(PathBuf),
    /// No manifest in the destination; nothing was done.
    DestinationManifestMissing(PathBuf),
}

/// Copies the root declarations of dependencies used by watched code into
/// destination manifests.
///
/// Both manifests are re-read on every call. Concurrent promotions into the
/// same destination are not serialised; the last write wins.
pub struct ManifestPromoter {
    root_manifest: PathBuf,
    resolver: Arc<DistributionResolver>,
    log: Arc<dyn Log>,
}

impl std::fmt::Debug for ManifestPromoter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestPromoter")
            .field("root_manifest", &self.root_manifest)
            .finish_non_exhaustive()
    }
}

impl ManifestPromoter {
    /// Create a promoter for the repository rooted at `root`.
    #[must_use]
    pub fn new(root: &Path, resolver: Arc<DistributionResolver>, log: Arc<dyn Log>) -> Self {
        Self {
            root_manifest: root.join(MANIFEST_FILE),
            resolver,
            log,
        }
    }

    /// Promote the dependencies used by `watch_path` into the manifest in
    /// `destination_dir`.
    ///
    /// A missing root or destination manifest is reported and returned as an
    /// outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] if a manifest cannot be read, parsed or
    /// written, or if resolving the used distributions fails.
    pub fn promote(
        &self,
        watch_path: &Path,
        destination_dir: &Path,
        is_directory: bool,
    ) -> Result<PromotionOutcome, ManifestError> {
        if !self.root_manifest.is_file() {
            self.log.warn(&format!(
                "root doesn't contain {MANIFEST_FILE}; skipping promotion"
            ));
            return Ok(PromotionOutcome::RootManifestMissing(
                self.root_manifest.clone(),
            ));
        }
        let destination_manifest = destination_dir.join(MANIFEST_FILE);
        if !destination_manifest.is_file() {
            self.log.warn(&format!(
                "workspace {} doesn't contain {MANIFEST_FILE}; skipping promotion",
                destination_dir.display()
            ));
            return Ok(PromotionOutcome::DestinationManifestMissing(
                destination_manifest,
            ));
        }

        self.log.debug(&format!(
            "promoting deps from {} to {}",
            watch_path.display(),
            destination_manifest.display()
        ));

        let used = self.resolver.resolve(watch_path, is_directory)?;
        let root = RootManifest::load(&self.root_manifest)?;
        let mut destination = DestinationManifest::load(&destination_manifest)?;

        let (installable, installable_dev) = root.installable(&used);
        let dependencies = destination.add_dependencies(&installable)?;
        let dev = destination.add_dev_dependencies(&installable_dev)?;
        destination.save()?;

        if dependencies > 0 {
            self.log.info(&format!(
                "{dependencies} deps promoted to {}",
                destination.path().display()
            ));
        }
        if dev > 0 {
            self.log.info(&format!(
                "{dev} dev deps promoted to {}",
                destination.path().display()
            ));
        }

        Ok(PromotionOutcome::Promoted { dependencies, dev })
    }
}
