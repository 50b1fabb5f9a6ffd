//! Command orchestration: configuration, environment discovery, and the
//! sync run.
pub mod sync;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, PythonOpts, SyncOpts};
use crate::config::{Configuration, DEFAULT_CONFIG_FILE};
use crate::deps::{DistributionResolver, ManifestPromoter, PythonEnvironment};
use crate::error::ConfigError;
use crate::logging::Log;
use crate::tasks::Context;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates root resolution and configuration loading so that the
/// command and the integration tests go through the same steps.
#[derive(Debug)]
pub struct CommandSetup {
    /// Canonical repository root.
    pub root: PathBuf,
    /// Loaded configuration.
    pub config: Configuration,
    /// Where the configuration came from, for messages.
    pub source: String,
}

impl CommandSetup {
    /// Resolve the root, load the configuration, and report validation
    /// warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be resolved or no usable
    /// configuration is found.
    pub fn init(global: &GlobalOpts, sync: &SyncOpts, log: &dyn Log) -> Result<Self> {
        let root = resolve_root(global)?;

        log.stage("Loading configuration");
        let (config, source) = resolve_config(global.config.as_deref(), sync, &root)?;
        log.info(&format!(
            "loaded {} rule(s), {} destination(s) from {source}",
            config.sync.len(),
            config.destination_count()
        ));

        let warnings = config.validate(&root, &source);
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!(
                    "  {} [{}]: {}",
                    warning.source, warning.item, warning.message
                ));
            }
        }

        Ok(Self {
            root,
            config,
            source,
        })
    }

    /// Discover the Python environment and wire the promoter into a task
    /// context.
    #[must_use]
    pub fn into_context(self, python: &PythonOpts, log: Arc<dyn Log>) -> Context {
        log.stage("Discovering Python environment");
        let environment = Arc::new(PythonEnvironment::discover(
            &python.to_discovery(),
            &self.root,
            log.as_ref(),
        ));
        for path in environment.search_paths() {
            log.debug(&format!("search path: {}", path.display()));
        }

        let resolver = Arc::new(DistributionResolver::new(environment, Arc::clone(&log)));
        let promoter = Arc::new(ManifestPromoter::new(&self.root, resolver, Arc::clone(&log)));
        Context::new(Arc::new(self.config), &self.root, log, promoter)
    }
}

/// Resolve the repository root from `--root` or the current directory.
///
/// # Errors
///
/// Returns an error if the directory does not exist or the current
/// directory cannot be determined.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    let root = match &global.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    dunce::canonicalize(&root).with_context(|| format!("invalid root {}", root.display()))
}

/// Pick the configuration source.
///
/// Precedence: an explicit file, then `molerat.json` in `root` when no rule
/// flags were given, then the rule flags. Returns the configuration and a
/// label for where it came from.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] when there is nothing to load, and the
/// load or flag error of the chosen source otherwise.
pub fn resolve_config(
    explicit: Option<&Path>,
    sync: &SyncOpts,
    root: &Path,
) -> Result<(Configuration, String), ConfigError> {
    if let Some(path) = explicit {
        let path = root.join(path);
        let config = Configuration::load(&path)?;
        return Ok((config, path.display().to_string()));
    }

    let flags = sync.to_flags();
    let default = root.join(DEFAULT_CONFIG_FILE);
    if !flags.any_rule_flags() && default.is_file() {
        let config = Configuration::load(&default)?;
        return Ok((config, DEFAULT_CONFIG_FILE.to_string()));
    }

    if flags.any_rule_flags() {
        return Ok((Configuration::from_flags(&flags)?, "command line".to_string()));
    }

    Err(ConfigError::Missing {
        default_file: DEFAULT_CONFIG_FILE.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::{Level, MemoryLog};

    const CONFIG: &str = r#"{"sync": [{"watch": "shared", "destinations": [{"path": "module_a"}]}]}"#;

    fn flags(watch: &str, destination: &str) -> SyncOpts {
        SyncOpts {
            watch: vec![PathBuf::from(watch)],
            destination: vec![PathBuf::from(destination)],
            ..SyncOpts::default()
        }
    }

    #[test]
    fn explicit_file_wins_over_everything() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("custom.json"), CONFIG).unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), r#"{"sync": []}"#).unwrap();

        let (config, source) =
            resolve_config(Some(Path::new("custom.json")), &flags("lib", "b"), dir.path()).unwrap();
        assert_eq!(config.sync[0].watch, PathBuf::from("shared"));
        assert!(source.ends_with("custom.json"));
    }

    #[test]
    fn default_file_used_without_rule_flags() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), CONFIG).unwrap();

        let (config, source) = resolve_config(None, &SyncOpts::default(), dir.path()).unwrap();
        assert_eq!(config.sync.len(), 1);
        assert_eq!(source, DEFAULT_CONFIG_FILE);
    }

    #[test]
    fn rule_flags_override_default_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), CONFIG).unwrap();

        let (config, source) = resolve_config(None, &flags("lib", "module_b"), dir.path()).unwrap();
        assert_eq!(config.sync[0].watch, PathBuf::from("lib"));
        assert_eq!(source, "command line");
    }

    #[test]
    fn nothing_configured_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_config(None, &SyncOpts::default(), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn watch_without_destination_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let opts = SyncOpts {
            watch: vec![PathBuf::from("shared")],
            ..SyncOpts::default()
        };
        let err = resolve_config(None, &opts, dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArguments(_)));
    }

    #[test]
    fn malformed_default_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "{").unwrap();
        let err = resolve_config(None, &SyncOpts::default(), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn init_reports_validation_warnings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            r#"{"sync": [{"watch": "shared", "destinations": []}]}"#,
        )
        .unwrap();
        let global = GlobalOpts {
            config: None,
            root: Some(dir.path().to_path_buf()),
            no_watch: true,
        };
        let log = MemoryLog::new();

        let setup = CommandSetup::init(&global, &SyncOpts::default(), &log).unwrap();

        assert_eq!(setup.config.sync.len(), 1);
        assert!(log.contains(Level::Warn, "configuration warning"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalOpts {
            config: None,
            root: Some(dir.path().join("nope")),
            no_watch: true,
        };
        assert!(resolve_root(&global).is_err());
    }
}
