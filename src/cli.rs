//! Command-line arguments.
use std::path::PathBuf;

use clap::{Args, Parser};

use crate::config::SyncFlags;
use crate::deps::DiscoveryOptions;

/// Version stamped by the build script, or the package version.
pub const VERSION: &str = match option_env!("MOLERAT_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "molerat",
    about = "Mirror watched Python source directories into monorepo workspaces",
    version = VERSION
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration source and run mode.
    #[command(flatten)]
    pub global: GlobalOpts,

    /// Sync rule given as flags.
    #[command(flatten)]
    pub sync: SyncOpts,

    /// Python environment used for dependency resolution.
    #[command(flatten)]
    pub python: PythonOpts,
}

/// Options controlling where configuration comes from and how the run ends.
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Configuration file (defaults to molerat.json in the root)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the repository root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Run the initial sync and exit without watching
    #[arg(long)]
    pub no_watch: bool,
}

/// Sync rule given on the command line instead of a configuration file.
///
/// Values are aligned by position: the n-th `--destination` belongs to the
/// n-th `--watch`.
#[derive(Args, Debug, Clone, Default)]
pub struct SyncOpts {
    /// Directory to watch
    #[arg(long, value_name = "DIR")]
    pub watch: Vec<PathBuf>,

    /// Destination workspace for the watch at the same position
    #[arg(long, value_name = "DIR")]
    pub destination: Vec<PathBuf>,

    /// Entrypoint of the destination at the same position
    #[arg(long, value_name = "FILE")]
    pub entrypoint: Vec<PathBuf>,

    /// Sync subdirectory name for the destination at the same position
    #[arg(long, value_name = "NAME")]
    pub directory: Vec<String>,

    /// Exclude pattern for the watch at the same position
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,
}

impl SyncOpts {
    /// Raw flag values for [`Configuration::from_flags`](crate::config::Configuration::from_flags).
    #[must_use]
    pub fn to_flags(&self) -> SyncFlags {
        SyncFlags {
            watch: self.watch.clone(),
            destination: self.destination.clone(),
            entrypoint: self.entrypoint.clone(),
            directory: self.directory.clone(),
            exclude: self.exclude.clone(),
        }
    }
}

/// Options for locating the Python environment used to resolve imports.
#[derive(Args, Debug, Clone, Default)]
pub struct PythonOpts {
    /// Python import search path to inspect (repeatable)
    #[arg(long, value_name = "DIR")]
    pub site_packages: Vec<PathBuf>,

    /// Interpreter to query for its import search path
    #[arg(long, value_name = "PROGRAM")]
    pub python: Option<String>,
}

impl PythonOpts {
    /// Discovery options for [`PythonEnvironment::discover`](crate::deps::PythonEnvironment::discover).
    #[must_use]
    pub fn to_discovery(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            site_packages: self.site_packages.clone(),
            python: self.python.clone(),
        }
    }
}
