//! Sync configuration: the `molerat.json` schema, loading, and flag-built configs.
pub mod pairing;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub use pairing::{ExcludePatterns, Pairing};

/// Name of the configuration file looked up in the repository root.
pub const DEFAULT_CONFIG_FILE: &str = "molerat.json";

/// Root configuration aggregate: an ordered list of sync rules.
///
/// Loaded once at startup and never mutated during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Sync rules in declaration order.
    pub sync: Vec<SyncRule>,
}

/// One watched source directory and the destinations it is mirrored into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRule {
    /// Directory to watch, relative to the repository root or absolute.
    pub watch: PathBuf,
    /// Glob patterns matched against each path segment during the initial copy.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    /// Destinations that receive a mirror of `watch`.
    pub destinations: Vec<DestinationRule>,
}

impl SyncRule {
    /// Exclude patterns, empty when none were configured.
    #[must_use]
    pub fn excludes(&self) -> &[String] {
        self.exclude.as_deref().unwrap_or_default()
    }
}

/// A destination workspace for a [`SyncRule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationRule {
    /// Workspace root; its `pyproject.toml` receives promoted dependencies.
    pub path: PathBuf,
    /// Workspace entrypoint. Accepted for compatibility, not used by syncing.
    #[serde(default)]
    pub entrypoint: Option<PathBuf>,
    /// Subdirectory name for the mirror; defaults to the watch directory's name.
    #[serde(default)]
    pub directory: Option<String>,
}

/// Raw `--watch`/`--destination`/... flag values, aligned by index.
#[derive(Debug, Clone, Default)]
pub struct SyncFlags {
    /// `--watch` values.
    pub watch: Vec<PathBuf>,
    /// `--destination` values.
    pub destination: Vec<PathBuf>,
    /// `--entrypoint` values.
    pub entrypoint: Vec<PathBuf>,
    /// `--directory` values.
    pub directory: Vec<String>,
    /// `--exclude` values.
    pub exclude: Vec<String>,
}

impl SyncFlags {
    /// Returns `true` when any flag that describes a sync rule was given.
    #[must_use]
    pub fn any_rule_flags(&self) -> bool {
        !self.watch.is_empty() || !self.destination.is_empty() || !self.entrypoint.is_empty()
    }
}

impl Configuration {
    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid configuration document.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse configuration text; `origin` is only used for error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Build a configuration from command-line flags.
    ///
    /// Each `--watch` becomes one rule with a single destination. The
    /// destination, entrypoint, directory, and exclude pattern at the same
    /// index belong to it; when fewer destinations than watches are given the
    /// last destination is reused.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidArguments`] if `--watch` or
    /// `--destination` is missing.
    pub fn from_flags(flags: &SyncFlags) -> Result<Self, ConfigError> {
        let Some(last_destination) = flags.destination.last() else {
            return Err(ConfigError::InvalidArguments(
                "--watch and --destination are required unless a config file is provided"
                    .to_string(),
            ));
        };
        if flags.watch.is_empty() {
            return Err(ConfigError::InvalidArguments(
                "--watch and --destination are required unless a config file is provided"
                    .to_string(),
            ));
        }

        let sync = flags
            .watch
            .iter()
            .enumerate()
            .map(|(idx, watch)| SyncRule {
                watch: watch.clone(),
                exclude: flags.exclude.get(idx).map(|p| vec![p.clone()]),
                destinations: vec![DestinationRule {
                    path: flags
                        .destination
                        .get(idx)
                        .unwrap_or(last_destination)
                        .clone(),
                    entrypoint: flags.entrypoint.get(idx).cloned(),
                    directory: flags.directory.get(idx).cloned(),
                }],
            })
            .collect();

        Ok(Self { sync })
    }

    /// Expand every (rule, destination) combination into a [`Pairing`],
    /// resolving relative paths against `root`.
    #[must_use]
    pub fn pairings(&self, root: &Path) -> Vec<Pairing> {
        self.sync
            .iter()
            .flat_map(|rule| {
                rule.destinations
                    .iter()
                    .map(move |dest| Pairing::new(root, rule, dest))
            })
            .collect()
    }

    /// Total number of destinations across all rules.
    #[must_use]
    pub fn destination_count(&self) -> usize {
        self.sync.iter().map(|r| r.destinations.len()).sum()
    }

    /// Run every non-fatal check; `source` names where the configuration
    /// came from in the warnings.
    #[must_use]
    pub fn validate(&self, root: &Path, source: &str) -> Vec<validation::ValidationWarning> {
        validation::validate_all(self, root, source)
    }
}

/// Shared helpers for configuration unit tests.
#[cfg(test)]
pub mod test_helpers {
    use super::{Configuration, DestinationRule, SyncRule};
    use std::path::PathBuf;

    /// A one-rule, one-destination configuration.
    #[must_use]
    pub fn single_rule(
        watch: &str,
        exclude: &[&str],
        destination: &str,
        directory: Option<&str>,
    ) -> Configuration {
        Configuration {
            sync: vec![SyncRule {
                watch: PathBuf::from(watch),
                exclude: Some(exclude.iter().map(ToString::to_string).collect()),
                destinations: vec![DestinationRule {
                    path: PathBuf::from(destination),
                    entrypoint: None,
                    directory: directory.map(String::from),
                }],
            }],
        }
    }
}
