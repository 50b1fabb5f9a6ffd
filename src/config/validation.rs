//! Non-fatal configuration checks reported at startup.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::pairing::{compile, is_single_segment};
use super::{Configuration, SyncRule};

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration source (e.g., "molerat.json", "command line").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Warning about `item` from `source`.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Trait for configuration validators.
///
/// Validators never reject a configuration. Anything they report is either
/// skipped or ignored later at sync time, so the warnings only explain why.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self, root: &Path) -> Vec<ValidationWarning>;
}

/// Validator for the shape of each sync rule.
#[derive(Debug)]
pub struct SyncRuleValidator<'a> {
    source: &'a str,
    rules: &'a [SyncRule],
}

impl<'a> SyncRuleValidator<'a> {
    /// Validator for `rules` loaded from `source`.
    #[must_use]
    pub const fn new(source: &'a str, rules: &'a [SyncRule]) -> Self {
        Self { source, rules }
    }
}

impl ConfigValidator for SyncRuleValidator<'_> {
    fn validate(&self, root: &Path) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for rule in self.rules {
            let item = rule.watch.display().to_string();

            if rule.watch.as_os_str().is_empty() {
                warnings.push(ValidationWarning::new(
                    self.source,
                    "<empty>",
                    "watch path is empty",
                ));
            } else if !root.join(&rule.watch).is_dir() {
                warnings.push(ValidationWarning::new(
                    self.source,
                    &item,
                    "watch path is not a directory; the rule will be skipped",
                ));
            }

            if rule.destinations.is_empty() {
                warnings.push(ValidationWarning::new(
                    self.source,
                    &item,
                    "rule has no destinations",
                ));
            }

            for pattern in rule.excludes() {
                if let Err(e) = compile(pattern) {
                    warnings.push(ValidationWarning::new(
                        self.source,
                        &item,
                        format!("invalid exclude pattern '{pattern}' is ignored: {e}"),
                    ));
                }
            }
        }

        warnings
    }
}

/// Validator for destinations across all rules.
#[derive(Debug)]
pub struct DestinationValidator<'a> {
    source: &'a str,
    config: &'a Configuration,
}

impl<'a> DestinationValidator<'a> {
    /// Validator for every destination of `config`, loaded from `source`.
    #[must_use]
    pub const fn new(source: &'a str, config: &'a Configuration) -> Self {
        Self { source, config }
    }
}

impl ConfigValidator for DestinationValidator<'_> {
    fn validate(&self, root: &Path) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let mut targets: HashMap<PathBuf, String> = HashMap::new();

        for rule in &self.config.sync {
            for dest in &rule.destinations {
                let item = dest.path.display().to_string();

                if let Some(dir) = dest.directory.as_deref()
                    && !dir.is_empty()
                    && (dir.contains(['/', '\\']) || !is_single_segment(Path::new(dir)))
                {
                    warnings.push(ValidationWarning::new(
                        self.source,
                        &item,
                        format!(
                            "directory '{dir}' is not a single path segment; the destination will be skipped"
                        ),
                    ));
                }

                let pairing = super::Pairing::new(root, rule, dest);
                let watch = rule.watch.display().to_string();
                if let Some(previous) = targets.insert(pairing.target.clone(), watch.clone())
                    && previous != watch
                {
                    warnings.push(ValidationWarning::new(
                        self.source,
                        &item,
                        format!(
                            "'{previous}' and '{watch}' both mirror into {}",
                            pairing.target.display()
                        ),
                    ));
                }
            }
        }

        warnings
    }
}

/// Validate all configuration and return collected warnings.
///
/// `source` names where the configuration came from and is attached to
/// every warning.
#[must_use]
pub fn validate_all(config: &Configuration, root: &Path, source: &str) -> Vec<ValidationWarning> {
    let validators: Vec<Box<dyn ConfigValidator + '_>> = vec![
        Box::new(SyncRuleValidator::new(source, &config.sync)),
        Box::new(DestinationValidator::new(source, config)),
    ];

    let mut all_warnings = Vec::new();
    for validator in validators {
        let warnings = validator.validate(root);
        all_warnings.extend(warnings);
    }

    all_warnings
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::test_helpers::single_rule;

    fn repo_with(dirs: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for d in dirs {
            std::fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        dir
    }

    #[test]
    fn valid_config_has_no_warnings() {
        let repo = repo_with(&["shared", "module_a"]);
        let config = single_rule("shared", &["*.pyc"], "module_a", None);
        assert!(validate_all(&config, repo.path(), "molerat.json").is_empty());
    }

    #[test]
    fn missing_watch_directory_is_reported() {
        let repo = repo_with(&["module_a"]);
        let config = single_rule("shared", &[], "module_a", None);
        let warnings = validate_all(&config, repo.path(), "molerat.json");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].item, "shared");
        assert!(warnings[0].message.contains("not a directory"));
    }

    #[test]
    fn rule_without_destinations_is_reported() {
        let repo = repo_with(&["shared"]);
        let mut config = single_rule("shared", &[], "module_a", None);
        config.sync[0].destinations.clear();
        let warnings = SyncRuleValidator::new("molerat.json", &config.sync).validate(repo.path());
        assert!(warnings.iter().any(|w| w.message == "rule has no destinations"));
    }

    #[test]
    fn invalid_exclude_pattern_is_reported() {
        let repo = repo_with(&["shared"]);
        let config = single_rule("shared", &["[oops"], "module_a", None);
        let warnings = validate_all(&config, repo.path(), "command line");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].source, "command line");
        assert!(warnings[0].message.contains("[oops"));
    }

    #[test]
    fn multi_segment_directory_is_reported() {
        let repo = repo_with(&["shared"]);
        let config = single_rule("shared", &[], "module_a", Some("a/b"));
        let warnings = validate_all(&config, repo.path(), "molerat.json");
        assert!(warnings.iter().any(|w| w.message.contains("single path segment")));
    }

    #[test]
    fn parent_directory_is_reported_and_empty_is_not() {
        let repo = repo_with(&["shared"]);
        let config = single_rule("shared", &[], "module_a", Some(".."));
        let warnings = validate_all(&config, repo.path(), "molerat.json");
        assert!(warnings.iter().any(|w| w.message.contains("will be skipped")));

        let config = single_rule("shared", &[], "module_a", Some(""));
        assert!(validate_all(&config, repo.path(), "molerat.json").is_empty());
    }

    #[test]
    fn colliding_targets_are_reported() {
        let repo = repo_with(&["one/shared", "two/shared"]);
        let json = r#"{"sync": [
            {"watch": "one/shared", "destinations": [{"path": "module_a"}]},
            {"watch": "two/shared", "destinations": [{"path": "module_a"}]}
        ]}"#;
        let config = Configuration::parse(json, Path::new("molerat.json")).unwrap();
        let warnings = validate_all(&config, repo.path(), "molerat.json");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("both mirror into"));
    }
}
