//! Butane snippets that stage extensions on first boot.
//!
//! The output describes the same layout the downloader produces, for
//! Ignition to apply at provisioning time instead.

use serde::Serialize;

use crate::catalog::Asset;
use crate::config::SysextConfig;
use crate::download::staged_image_path;
use crate::error::{SysextError, SysextResult};

const BUTANE_VARIANT: &str = "flatcar";
const BUTANE_VERSION: &str = "1.0.0";
const FILE_MODE: u32 = 0o644;

/// Snippet rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Add a sysupdate config file entry per extension.
    pub include_sysupdate_config: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_sysupdate_config: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct ButaneConfig {
    variant: &'static str,
    version: &'static str,
    storage: Storage,
}

#[derive(Debug, Serialize)]
struct Storage {
    files: Vec<FileEntry>,
    links: Vec<LinkEntry>,
}

#[derive(Debug, Serialize)]
struct FileEntry {
    path: String,
    mode: u32,
    contents: Contents,
}

#[derive(Debug, Serialize)]
struct Contents {
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification: Option<Verification>,
}

#[derive(Debug, Serialize)]
struct Verification {
    hash: String,
}

#[derive(Debug, Serialize)]
struct LinkEntry {
    path: String,
    target: String,
    hard: bool,
}

/// Render a Butane (`variant: flatcar`) snippet for `assets`.
///
/// Assets are emitted in `(extension, version, arch)` order. Each extension
/// gets one activation link, pointing at its first asset in that order.
///
/// # Errors
///
/// `EmptySnippet` for an empty list, `InvalidAssetChecksum` when a digest
/// is not hex.
pub fn render_butane(
    assets: &[Asset],
    options: RenderOptions,
    config: &SysextConfig,
) -> SysextResult<String> {
    if assets.is_empty() {
        return Err(SysextError::EmptySnippet);
    }

    let mut sorted: Vec<&Asset> = assets.iter().collect();
    sorted.sort_by(|a, b| {
        a.extension
            .cmp(&b.extension)
            .then_with(|| a.version.cmp(&b.version))
            .then_with(|| a.arch.cmp(&b.arch))
    });

    let mut files = Vec::with_capacity(sorted.len() * 2);
    for asset in &sorted {
        if hex::decode(&asset.checksum).is_err() {
            return Err(SysextError::InvalidAssetChecksum {
                name: asset.name.clone(),
                checksum: asset.checksum.clone(),
            });
        }
        files.push(FileEntry {
            path: staged_image_path(asset).display().to_string(),
            mode: FILE_MODE,
            contents: Contents {
                source: asset.download_url.clone(),
                verification: Some(Verification {
                    hash: format!("sha256-{}", asset.checksum.to_lowercase()),
                }),
            },
        });
    }

    let extensions = first_per_extension(&sorted);

    if options.include_sysupdate_config {
        files.extend(extensions.iter().map(|asset| FileEntry {
            path: format!("/etc/sysupdate.{0}.d/{0}.conf", asset.extension),
            mode: FILE_MODE,
            contents: Contents {
                source: config.sysupdate_config_url(&asset.extension),
                verification: None,
            },
        }));
    }

    let links = extensions
        .iter()
        .map(|asset| LinkEntry {
            path: format!("/etc/extensions/{}.raw", asset.extension),
            target: staged_image_path(asset).display().to_string(),
            hard: false,
        })
        .collect();

    let document = ButaneConfig {
        variant: BUTANE_VARIANT,
        version: BUTANE_VERSION,
        storage: Storage { files, links },
    };
    Ok(serde_yaml_ng::to_string(&document)?)
}

/// First asset of each extension, keeping order. Input must be sorted.
fn first_per_extension<'a>(sorted: &[&'a Asset]) -> Vec<&'a Asset> {
    let mut firsts: Vec<&Asset> = Vec::new();
    for &asset in sorted {
        if firsts.last().map(|a| &a.extension) != Some(&asset.extension) {
            firsts.push(asset);
        }
    }
    firsts
}
