//! Installed-distribution lookup against a Python import search path.
//!
//! Mirrors what the interpreter's path finder and `importlib.metadata` do,
//! without running Python for every package: a module's origin is located on
//! the search path, then matched against the file lists (`RECORD`,
//! `installed-files.txt`) of every installed distribution.
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use crate::error::ResolveError;
use crate::exec;
use crate::logging::Log;

/// Maps an importable package to the distribution that installed it.
pub trait DistributionLookup: Send + Sync {
    /// Name of the distribution owning `package`, or `None` when the package
    /// is not installed, is a namespace package, or has no owning
    /// distribution (standard library, local code).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Lookup`] when the environment cannot be
    /// inspected. Callers treat this as an absent distribution.
    fn distribution_for(&self, package: &str) -> Result<Option<String>, ResolveError>;
}

/// How to find the Python environment to inspect.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Explicit search paths; when non-empty nothing else is consulted.
    pub site_packages: Vec<PathBuf>,
    /// Interpreter to query for `sys.path`.
    pub python: Option<String>,
}

/// A Python import search path and the distributions installed on it.
#[derive(Debug)]
pub struct PythonEnvironment {
    search_paths: Vec<PathBuf>,
    /// Canonical file path → owning distribution, built on first lookup.
    index: OnceLock<HashMap<PathBuf, String>>,
}

impl PythonEnvironment {
    /// An environment over an explicit search path, in priority order.
    #[must_use]
    pub const fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            index: OnceLock::new(),
        }
    }

    /// Discover the environment for a repository rooted at `root`.
    ///
    /// Tries, in order: explicit search paths, an explicit interpreter,
    /// `$VIRTUAL_ENV`, `<root>/.venv`, then `python3`/`python` from `PATH`.
    /// Falls back to an empty search path (every package resolves absent).
    #[must_use]
    pub fn discover(options: &DiscoveryOptions, root: &Path, log: &dyn Log) -> Self {
        let virtual_env = std::env::var_os("VIRTUAL_ENV").map(PathBuf::from);
        Self::discover_with(options, root, virtual_env.as_deref(), log)
    }

    fn discover_with(
        options: &DiscoveryOptions,
        root: &Path,
        virtual_env: Option<&Path>,
        log: &dyn Log,
    ) -> Self {
        if !options.site_packages.is_empty() {
            let paths: Vec<PathBuf> = options.site_packages.iter().map(|p| root.join(p)).collect();
            log.debug(&format!("using {} explicit search path(s)", paths.len()));
            return Self::new(paths);
        }

        if let Some(program) = &options.python {
            if let Some(paths) = interpreter_paths(Some(program), log) {
                return Self::new(paths);
            }
        } else {
            let local = root.join(".venv");
            for venv in virtual_env.into_iter().chain([local.as_path()]) {
                let paths = venv_site_packages(venv);
                if !paths.is_empty() {
                    log.debug(&format!("using virtual environment {}", venv.display()));
                    return Self::new(paths);
                }
            }
            if let Some(paths) = interpreter_paths(None, log) {
                return Self::new(paths);
            }
        }

        log.warn("no Python search path found; dependencies will not be promoted");
        Self::new(Vec::new())
    }

    /// The search path, in priority order.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// File that `import <package>` would load, if any.
    ///
    /// Per search path: a regular package's `__init__` file, then an
    /// extension module, then `<package>.py`, then `<package>.pyc`.
    /// Namespace packages have no origin.
    #[must_use]
    pub fn module_origin(&self, package: &str) -> Option<PathBuf> {
        if package.is_empty() || package.contains(['/', '\\', '.']) {
            return None;
        }
        self.search_paths
            .iter()
            .find_map(|dir| origin_in(dir, package))
    }

    fn index(&self) -> &HashMap<PathBuf, String> {
        self.index.get_or_init(|| build_index(&self.search_paths))
    }
}

impl DistributionLookup for PythonEnvironment {
    fn distribution_for(&self, package: &str) -> Result<Option<String>, ResolveError> {
        let Some(origin) = self.module_origin(package) else {
            return Ok(None);
        };
        let origin = dunce::canonicalize(&origin).map_err(|e| ResolveError::Lookup {
            package: package.to_string(),
            reason: format!("cannot resolve {}: {e}", origin.display()),
        })?;
        Ok(self.index().get(&origin).cloned())
    }
}

fn interpreter_paths(program: Option<&str>, log: &dyn Log) -> Option<Vec<PathBuf>> {
    let Some(python) = exec::find_python(program) else {
        log.warn(&format!(
            "Python interpreter not found: {}",
            program.unwrap_or("python3/python")
        ));
        return None;
    };
    match exec::python_sys_path(&python) {
        Ok(paths) => {
            log.debug(&format!(
                "using sys.path of {} ({} entries)",
                python.display(),
                paths.len()
            ));
            Some(paths)
        }
        Err(e) => {
            log.warn(&format!("{e:#}"));
            None
        }
    }
}

/// `site-packages` directories of a virtual environment.
fn venv_site_packages(venv: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = sorted_entries(&venv.join("lib"))
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(OsStr::to_str)
                .is_some_and(|n| n.starts_with("python"))
        })
        .map(|p| p.join("site-packages"))
        .filter(|p| p.is_dir())
        .collect();
    let windows = venv.join("Lib").join("site-packages");
    if windows.is_dir() && !found.contains(&windows) {
        found.push(windows);
    }
    found
}

fn origin_in(dir: &Path, package: &str) -> Option<PathBuf> {
    let package_dir = dir.join(package);
    if package_dir.is_dir() {
        let init = package_dir.join("__init__.py");
        if init.is_file() {
            return Some(init);
        }
        if let Some(init) = sorted_entries(&package_dir).into_iter().find(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(OsStr::to_str)
                    .is_some_and(|n| n.starts_with("__init__."))
        }) {
            return Some(init);
        }
    }

    let prefix = format!("{package}.");
    let extension = sorted_entries(dir).into_iter().find(|p| {
        p.is_file()
            && p.file_name().and_then(OsStr::to_str).is_some_and(|n| {
                n.starts_with(&prefix)
                    && Path::new(n)
                        .extension()
                        .is_some_and(|e| e == "so" || e == "pyd")
            })
    });
    if extension.is_some() {
        return extension;
    }

    ["py", "pyc"]
        .iter()
        .map(|ext| dir.join(format!("{package}.{ext}")))
        .find(|p| p.is_file())
}

/// Directory entries sorted by name; unreadable directories yield nothing.
fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(Result::ok).map(|e| e.path()).collect())
        .unwrap_or_default();
    entries.sort();
    entries
}

/// An installed distribution's metadata directory.
#[derive(Debug)]
enum MetadataDir {
    DistInfo(PathBuf),
    EggInfo(PathBuf),
}

impl MetadataDir {
    fn from_path(path: PathBuf) -> Option<Self> {
        if !path.is_dir() {
            return None;
        }
        match path.extension().and_then(OsStr::to_str) {
            Some("dist-info") => Some(Self::DistInfo(path)),
            Some("egg-info") => Some(Self::EggInfo(path)),
            _ => None,
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::DistInfo(p) | Self::EggInfo(p) => p,
        }
    }

    fn name(&self) -> Option<String> {
        let metadata = match self {
            Self::DistInfo(p) => p.join("METADATA"),
            Self::EggInfo(p) => p.join("PKG-INFO"),
        };
        std::fs::read_to_string(metadata)
            .ok()
            .and_then(|text| metadata_name(&text))
            .or_else(|| {
                self.path()
                    .file_stem()
                    .and_then(OsStr::to_str)
                    .and_then(|stem| stem.split('-').next())
                    .filter(|n| !n.is_empty())
                    .map(String::from)
            })
    }

    /// Installed files as absolute, lexically normalised paths.
    fn files(&self) -> Vec<PathBuf> {
        let (listing, base) = match self {
            Self::DistInfo(p) => (p.join("RECORD"), p.parent().map(Path::to_path_buf)),
            Self::EggInfo(p) => (p.join("installed-files.txt"), Some(p.clone())),
        };
        let Some(base) = base else {
            return Vec::new();
        };
        let Ok(text) = std::fs::read_to_string(listing) else {
            return Vec::new();
        };
        let base = dunce::canonicalize(&base).unwrap_or(base);
        let entries: Vec<&str> = match self {
            Self::DistInfo(_) => text.lines().filter_map(record_path).collect(),
            Self::EggInfo(_) => text.lines().map(str::trim).filter(|l| !l.is_empty()).collect(),
        };
        entries
            .into_iter()
            .map(|entry| normalize(&base.join(entry)))
            .collect()
    }
}

/// `Name:` header of a core-metadata document.
fn metadata_name(text: &str) -> Option<String> {
    text.lines()
        .take_while(|line| !line.is_empty())
        .find_map(|line| line.strip_prefix("Name:"))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
}

/// Path column of a `RECORD` line (CSV, path may be quoted).
fn record_path(line: &str) -> Option<&str> {
    let line = line.trim_end();
    let path = if let Some(rest) = line.strip_prefix('"') {
        rest.split('"').next()?
    } else {
        line.split(',').next()?
    };
    (!path.is_empty()).then_some(path)
}

/// Resolve `.` and `..` components without touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Map every installed file to the first distribution listing it.
fn build_index(search_paths: &[PathBuf]) -> HashMap<PathBuf, String> {
    let mut index = HashMap::new();
    for dir in search_paths {
        for meta in sorted_entries(dir).into_iter().filter_map(MetadataDir::from_path) {
            let Some(name) = meta.name() else {
                continue;
            };
            for file in meta.files() {
                index.entry(file).or_insert_with(|| name.clone());
            }
        }
    }
    index
}
