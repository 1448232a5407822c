//! Extension catalog: manifest parsing, assembly, fetching and resolution.
//!
//! The pipeline for one invocation is:
//!
//! ```text
//! CatalogFetcher ──bytes──► manifest::parse_manifest ──records──► assemble
//!                                                                    │
//!                                    resolve(catalog, ext, arch, q) ◄┘
//! ```
//!
//! A [`Catalog`] is built fresh per invocation and is read-only afterwards,
//! apart from [`Catalog::filter_extension`].

mod assemble;
mod cache;
mod fetch;
mod manifest;
mod resolve;

pub use assemble::assemble;
pub use cache::CatalogCache;
pub use fetch::{build_catalog, manifest_candidates, release_tag_for, CatalogFetcher};
pub use manifest::{compose_filename, decompose_filename, parse_manifest, ManifestRecord, ARTIFACT_SUFFIX};
pub use resolve::{is_latest_query, resolve};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::SysextError;

/// Architectures the bakery publishes images for.
///
/// Ordering follows the token name, so `Arm64 < X86_64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Architecture {
    #[serde(rename = "arm64")]
    Arm64,
    #[serde(rename = "x86-64")]
    X86_64,
}

impl Architecture {
    /// Every recognized architecture.
    pub const ALL: [Architecture; 2] = [Architecture::Arm64, Architecture::X86_64];

    /// Token used in filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Arm64 => "arm64",
            Architecture::X86_64 => "x86-64",
        }
    }

    /// Architecture of the running build, falling back to x86-64.
    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "aarch64" => Architecture::Arm64,
            _ => Architecture::X86_64,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = SysextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Architecture::ALL
            .into_iter()
            .find(|arch| arch.as_str() == s)
            .ok_or_else(|| SysextError::UnknownArchitecture(s.to_string()))
    }
}

/// A downloadable extension image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    /// Original filename, e.g. `docker-28.0.4-x86-64.raw`.
    pub name: String,

    /// Extension name, e.g. `docker-buildx`.
    pub extension: String,

    /// Free-form version, may carry build metadata (`v1.32.2+k3s1`).
    pub version: String,

    pub arch: Architecture,

    /// Lowercase hex SHA-256 digest.
    pub checksum: String,

    /// Canonical fetch location.
    pub download_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// All assets sharing one `(extension, version)`, keyed by architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub extension: String,
    pub version: String,
    pub assets: BTreeMap<Architecture, Asset>,
}

impl Release {
    pub fn new(extension: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            version: version.into(),
            assets: BTreeMap::new(),
        }
    }

    /// Asset for an architecture, if published.
    pub fn asset(&self, arch: Architecture) -> Option<&Asset> {
        self.assets.get(&arch)
    }
}

/// Every known extension mapped to its releases, newest first.
///
/// "Newest" is descending lexicographic order of the version string, not
/// semver: `v1.9.0` sorts ahead of `v1.10.0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub extensions: BTreeMap<String, Vec<Release>>,
}

impl Catalog {
    /// Whether any asset carries a publication timestamp.
    pub fn has_publish_info(&self) -> bool {
        self.extensions
            .values()
            .flatten()
            .flat_map(|release| release.assets.values())
            .any(|asset| asset.published_at.is_some())
    }

    /// Sorted extension names.
    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions.keys().map(String::as_str).collect()
    }

    /// Releases of an extension, newest first.
    pub fn releases_for(&self, extension: &str) -> Result<&[Release], SysextError> {
        self.extensions
            .get(extension)
            .map(Vec::as_slice)
            .ok_or_else(|| SysextError::UnknownExtension {
                extension: extension.to_string(),
            })
    }

    /// Newest release of the extension that publishes `arch`.
    pub fn latest(&self, extension: &str, arch: Architecture) -> Option<&Asset> {
        self.extensions
            .get(extension)?
            .iter()
            .find_map(|release| release.asset(arch))
    }

    /// Exact `(extension, version, arch)` lookup.
    pub fn find(&self, extension: &str, version: &str, arch: Architecture) -> Option<&Asset> {
        self.extensions
            .get(extension)?
            .iter()
            .find(|release| release.version == version)?
            .asset(arch)
    }

    /// Keep only the named extension. An absent extension leaves the catalog
    /// empty; an empty name is a no-op.
    pub fn filter_extension(&mut self, extension: &str) {
        if extension.is_empty() {
            return;
        }
        self.extensions.retain(|name, _| name == extension);
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// Inputs for building a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CatalogOptions {
    /// Only keep this extension.
    pub extension_filter: Option<String>,

    /// Try this release's manifest first.
    pub release_tag: Option<String>,
}

impl CatalogOptions {
    /// Options for one extension, optionally pinned to a version.
    pub fn for_extension(extension: &str, version: Option<&str>) -> Self {
        Self {
            extension_filter: Some(extension.to_string()),
            release_tag: Some(release_tag_for(extension, version)),
        }
    }
}
