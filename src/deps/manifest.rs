//! `pyproject.toml` access for dependency promotion.
//!
//! The root manifest is only read, so it is deserialised into a typed view.
//! Destination manifests are edited in place through [`toml_edit`] so that
//! comments, ordering and unrelated tables survive the rewrite.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use toml_edit::{Array, DocumentMut, Item, Value};

use crate::error::ManifestError;

/// Name of the manifest file in the repository root and in each destination.
pub const MANIFEST_FILE: &str = "pyproject.toml";

#[derive(Debug, Default, Deserialize)]
struct RootDocument {
    #[serde(default)]
    project: ProjectSection,
    #[serde(default, rename = "dependency-groups")]
    dependency_groups: HashMap<String, Vec<GroupEntry>>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectSection {
    #[serde(default)]
    dependencies: Vec<String>,
}

/// A dependency-group entry: a requirement string or an
/// `{include-group = "..."}` table, which is never promoted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GroupEntry {
    Requirement(String),
    Other(toml::Value),
}

/// Declared dependencies of the repository root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootManifest {
    /// `project.dependencies`.
    pub dependencies: Vec<String>,
    /// `dependency-groups.dev` requirement strings.
    pub dev: Vec<String>,
}

impl RootManifest {
    /// Read the root manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be read and
    /// [`ManifestError::Parse`] if it is not a valid manifest.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = read(path)?;
        Self::parse(&text, path)
    }

    /// Parse manifest text; `path` is only used for error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] on invalid TOML or when a known key
    /// has the wrong type.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ManifestError> {
        let mut doc: RootDocument = toml::from_str(text).map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        let dev = doc
            .dependency_groups
            .remove("dev")
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| match entry {
                GroupEntry::Requirement(req) => Some(req),
                GroupEntry::Other(_) => None,
            })
            .collect();
        Ok(Self {
            dependencies: doc.project.dependencies,
            dev,
        })
    }

    /// Root declarations for the `used` distributions, as
    /// `(dependencies, dev)`.
    ///
    /// A declaration matches when its text starts with the distribution
    /// name, so version specifiers and extras are carried along. The match
    /// is a plain prefix test: `requests` also selects `requests-oauthlib`.
    #[must_use]
    pub fn installable(&self, used: &[String]) -> (Vec<String>, Vec<String>) {
        (
            prefix_matches(used, &self.dependencies),
            prefix_matches(used, &self.dev),
        )
    }
}

fn prefix_matches(used: &[String], declared: &[String]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for name in used {
        for decl in declared {
            if decl.starts_with(name.as_str()) && !found.contains(decl) {
                found.push(decl.clone());
            }
        }
    }
    found
}

/// A destination manifest opened for editing.
#[derive(Debug)]
pub struct DestinationManifest {
    path: PathBuf,
    doc: DocumentMut,
}

impl DestinationManifest {
    /// Open the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be read and
    /// [`ManifestError::Parse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = read(path)?;
        let doc = text
            .parse::<DocumentMut>()
            .map_err(|e: toml_edit::TomlError| ManifestError::Parse {
                path: path.to_path_buf(),
                message: e.message().to_string(),
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    /// Append `entries` to `project.dependencies`.
    ///
    /// Returns how many were added.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Shape`] if `project` is not a table or
    /// `project.dependencies` is not an array.
    pub fn add_dependencies(&mut self, entries: &[String]) -> Result<usize, ManifestError> {
        self.append("project", "dependencies", entries)
    }

    /// Append `entries` to `dependency-groups.dev`.
    ///
    /// Returns how many were added.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Shape`] if `dependency-groups` is not a table
    /// or `dependency-groups.dev` is not an array.
    pub fn add_dev_dependencies(&mut self, entries: &[String]) -> Result<usize, ManifestError> {
        self.append("dependency-groups", "dev", entries)
    }

    /// Append each entry not already present (exact string match), creating
    /// the table and array on demand. Existing entries keep their order.
    fn append(&mut self, table: &str, key: &str, entries: &[String]) -> Result<usize, ManifestError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let shape = |key: String, expected| ManifestError::Shape {
            path: self.path.clone(),
            key,
            expected,
        };

        let section = self
            .doc
            .entry(table)
            .or_insert(toml_edit::table())
            .as_table_like_mut()
            .ok_or_else(|| shape(table.to_string(), "table"))?;
        let array = section
            .entry(key)
            .or_insert(Item::Value(Value::Array(Array::new())))
            .as_array_mut()
            .ok_or_else(|| shape(format!("{table}.{key}"), "array"))?;

        let mut added = 0;
        for entry in entries {
            if !array.iter().any(|v| v.as_str() == Some(entry.as_str())) {
                array.push(entry.as_str());
                added += 1;
            }
        }
        Ok(added)
    }

    /// Write the document back to its file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be written.
    pub fn save(&self) -> Result<(), ManifestError> {
        std::fs::write(&self.path, self.doc.to_string()).map_err(|source| ManifestError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Path of the manifest file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read(path: &Path) -> Result<String, ManifestError> {
    std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })
}
