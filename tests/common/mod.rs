// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed monorepo and a fluent builder so
// each integration test can set up an isolated workspace without repeating
// filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use molerat::config::Configuration;
use molerat::deps::{DistributionResolver, ManifestPromoter, PythonEnvironment};
use molerat::logging::MemoryLog;
use molerat::tasks::Context;

/// Name of the fake site-packages directory inside the test repository.
pub const SITE_PACKAGES: &str = "site-packages";

/// Configuration mirroring `shared` into `module_a`, excluding `skipme.py`.
pub const SHARED_CONFIG: &str = r#"{
  "sync": [
    {
      "watch": "shared",
      "exclude": ["skipme.py"],
      "destinations": [{"path": "module_a", "entrypoint": null, "directory": null}]
    }
  ]
}"#;

/// Write the standard monorepo layout into `root`.
///
/// Creates:
/// - `shared/util.py`               — imports `math`
/// - `shared/skipme.py`             — excluded by [`SHARED_CONFIG`]
/// - `module_a/pyproject.toml`      — no dependencies
/// - `pyproject.toml`               — root manifest declaring `math`
/// - `.gitignore`
/// - `molerat.json`                 — [`SHARED_CONFIG`]
/// - `site-packages/`               — `math` installed as distribution `math`
pub fn setup_monorepo(root: &Path) {
    write(root, "shared/util.py", "import math\n\nprint(math.pi)\n");
    write(root, "shared/skipme.py", "print('skip me')\n");
    write(root, "module_a/pyproject.toml", "[project]\nname = \"module_a\"\ndependencies = []\n");
    write(root, "pyproject.toml", "[project]\nname = \"root\"\ndependencies = [\"math\"]\n");
    write(root, ".gitignore", "__pycache__/\n");
    write(root, "molerat.json", SHARED_CONFIG);
    install_package(root, "math", "math");
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(&path, content).expect("write file");
}

/// Install `package` into the fake site-packages as part of `distribution`.
pub fn install_package(root: &Path, package: &str, distribution: &str) {
    let site = root.join(SITE_PACKAGES);
    write(&site, &format!("{package}/__init__.py"), "");
    let dist_info = format!("{distribution}-1.0.dist-info");
    write(
        &site,
        &format!("{dist_info}/METADATA"),
        &format!("Metadata-Version: 2.1\nName: {distribution}\nVersion: 1.0\n"),
    );
    write(
        &site,
        &format!("{dist_info}/RECORD"),
        &format!("{package}/__init__.py,sha256=,0\n{dist_info}/METADATA,,\n{dist_info}/RECORD,,\n"),
    );
}

/// An isolated monorepo backed by a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct TestRepo {
    dir: tempfile::TempDir,
    root: PathBuf,
}

impl TestRepo {
    /// Create a repository with the standard monorepo layout.
    pub fn new() -> Self {
        let repo = Self::empty();
        setup_monorepo(&repo.root);
        repo
    }

    /// Create an empty repository.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dunce::canonicalize(dir.path()).expect("canonicalize temp dir");
        Self { dir, root }
    }

    /// Canonical repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `rel`.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> &Self {
        write(&self.root, rel, content);
        self
    }

    /// Read `rel` as text.
    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).expect("read file")
    }

    /// Returns `true` if `rel` exists.
    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Remove `rel`.
    pub fn remove(&self, rel: &str) {
        std::fs::remove_file(self.path(rel)).expect("remove file");
    }

    /// A silent context for `config` whose resolver only sees the fake
    /// site-packages.
    pub fn context(&self, config: Configuration) -> (Context, Arc<MemoryLog>) {
        let log = Arc::new(MemoryLog::new());
        let environment = Arc::new(PythonEnvironment::new(vec![self.path(SITE_PACKAGES)]));
        let resolver = Arc::new(DistributionResolver::new(environment, log.clone()));
        let promoter = Arc::new(ManifestPromoter::new(&self.root, resolver, log.clone()));
        let ctx = Context::new(Arc::new(config), &self.root, log.clone(), promoter);
        (ctx, log)
    }

    /// A silent context for the repository's `molerat.json`.
    pub fn default_context(&self) -> (Context, Arc<MemoryLog>) {
        let config = Configuration::load(&self.path("molerat.json")).expect("load molerat.json");
        self.context(config)
    }
}

/// Entries of `[project].dependencies` in manifest text.
pub fn project_dependencies(manifest: &str) -> Vec<String> {
    let doc: toml::Value = toml::from_str(manifest).expect("parse manifest");
    doc.get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(toml::Value::as_array)
        .map(|deps| {
            deps.iter()
                .filter_map(toml::Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
