//! Domain-specific error types for the molerat engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ConfigError`], [`ManifestError`])
//! while the command handler at the CLI boundary converts them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! MoleratError
//! ├── Config(ConfigError)      — configuration missing, unreadable or malformed
//! ├── Sync(SyncError)          — invalid watch/destination paths
//! ├── Scan(ScanError)          — a source file could not be parsed
//! ├── Resolve(ResolveError)    — distribution lookup failures
//! ├── Manifest(ManifestError)  — pyproject.toml read/write problems
//! └── Watch(WatchError)        — file-system notification failures
//! ```
//!
//! Only [`ConfigError`] is fatal for a run. Every other variant is local to a
//! pairing, a promotion or a single file and is reported, never escalated.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the molerat engine.
#[derive(Error, Debug)]
pub enum MoleratError {
    /// Configuration-related error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A pairing could not be synchronised.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// A source file could not be scanned for imports.
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Distribution resolution failed.
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// A manifest could not be read, merged or written.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// The file watch facility failed.
    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),
}

/// Errors that arise from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No configuration could be resolved from flags, a config file, or the default file.
    #[error("no configuration found: pass --config, create {default_file}, or use --watch and --destination")]
    Missing {
        /// Name of the default configuration file that was looked for.
        default_file: String,
    },

    /// The configuration file could not be read.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON or does not match the schema.
    #[error("Invalid config file {path}: {source}")]
    Parse {
        /// Path to the malformed file.
        path: PathBuf,
        /// Underlying deserialization error.
        source: serde_json::Error,
    },

    /// Command-line sync flags are inconsistent.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Errors that prevent a single pairing from being synchronised.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The watch path does not exist or is not a directory.
    #[error("cannot watch {}: not a directory or not a valid path", path.display())]
    InvalidWatchPath {
        /// Offending watch path.
        path: PathBuf,
    },

    /// The destination root does not exist or is not a directory.
    #[error("{} is not a valid destination", path.display())]
    InvalidDestinationPath {
        /// Offending destination path.
        path: PathBuf,
    },
}

/// Errors that arise while scanning a Python source file.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The source contains syntax errors.
    #[error("syntax error in {} at line {line}", path.display())]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// One-based line of the first syntax error.
        line: usize,
    },

    /// The Python grammar could not be loaded into the parser.
    #[error("failed to load Python grammar: {0}")]
    Grammar(String),

    /// The file could not be read.
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise while resolving packages to distributions.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A directory scan was requested for a path that is not a directory.
    #[error("{} is not a directory", path.display())]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },

    /// Looking up the distribution for a package failed.
    ///
    /// Callers treat this as an absent distribution.
    #[error("lookup for package '{package}' failed: {reason}")]
    Lookup {
        /// Package whose lookup failed.
        package: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A single source file could not be scanned.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Errors that arise from manifest promotion.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest could not be read or written.
    #[error("IO error on manifest {}: {source}", path.display())]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest is not valid TOML.
    #[error("Invalid TOML in {}: {message}", path.display())]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A known section exists but has an unexpected shape.
    #[error("Unexpected shape for '{key}' in {}: expected {expected}", path.display())]
    Shape {
        /// Manifest path.
        path: PathBuf,
        /// Dotted key of the offending item.
        key: String,
        /// Expected TOML type.
        expected: &'static str,
    },

    /// Resolving the used distributions failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Errors that arise from the file watch facility.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The underlying notification backend reported an error.
    #[error("watch backend error for {}: {source}", path.display())]
    Backend {
        /// Watched path.
        path: PathBuf,
        /// Underlying notify error.
        source: notify::Error,
    },

    /// The delivery thread for a subscription could not be spawned.
    #[error("failed to start watch thread for {}: {source}", path.display())]
    Thread {
        /// Watched path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
