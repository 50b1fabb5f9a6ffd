//! Dependency discovery and promotion.
//!
//! Leaves first: [`imports`] scans Python sources for imported packages,
//! [`site_packages`] maps a package to its installed distribution,
//! [`resolver`] combines both behind a shared cache, and [`promoter`]
//! copies matching root declarations into destination manifests.
pub mod imports;
pub mod manifest;
pub mod promoter;
pub mod resolver;
pub mod site_packages;

pub use imports::ImportScanner;
pub use manifest::{DestinationManifest, MANIFEST_FILE, RootManifest};
pub use promoter::{ManifestPromoter, PromotionOutcome};
pub use resolver::DistributionResolver;
pub use site_packages::{DiscoveryOptions, DistributionLookup, PythonEnvironment};
