//! Activation symlink management.
//!
//! `systemd-sysext` picks up images from `/etc/extensions/<name>.raw`. The
//! link points at the absolute host path of the staged image so it stays
//! valid when the root is mounted at `/` on first boot.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use crate::catalog::Asset;
use crate::error::{SysextError, SysextResult};

use super::publish::ensure_dir;

/// Host path an image is staged at, independent of the root.
pub fn staged_image_path(asset: &Asset) -> PathBuf {
    Path::new("/opt/extensions")
        .join(&asset.extension)
        .join(&asset.name)
}

/// Activation link path for an extension under `root`.
pub fn activation_link_path(root: &Path, extension: &str) -> PathBuf {
    root.join("etc")
        .join("extensions")
        .join(format!("{}.raw", extension))
}

/// Make `root/etc/extensions/<extension>.raw` point at the staged image.
///
/// * Already pointing there: nothing to do.
/// * Pointing elsewhere: replaced atomically.
/// * A regular file or directory in the way: `ConflictingSymlinkTarget`,
///   the existing entry is left alone.
pub fn ensure_symlink(root: &Path, asset: &Asset) -> SysextResult<PathBuf> {
    let link_path = activation_link_path(root, &asset.extension);
    let target = staged_image_path(asset);
    if let Some(parent) = link_path.parent() {
        ensure_dir(parent)?;
    }

    match fs::symlink_metadata(&link_path) {
        Ok(metadata) if !metadata.file_type().is_symlink() => {
            return Err(SysextError::ConflictingSymlinkTarget { path: link_path });
        }
        Ok(_) => {
            let current = fs::read_link(&link_path).map_err(|e| SysextError::ReadFailed {
                path: link_path.clone(),
                source: e,
            })?;
            if current == target {
                return Ok(link_path);
            }
            tracing::debug!(
                link = %link_path.display(),
                from = %current.display(),
                to = %target.display(),
                "replacing activation symlink"
            );
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(SysextError::ReadFailed {
                path: link_path,
                source: e,
            })
        }
    }

    replace_symlink(&target, &link_path)?;
    Ok(link_path)
}

/// Create the link beside its final location, then rename it into place.
fn replace_symlink(target: &Path, link_path: &Path) -> SysextResult<()> {
    let file_name = link_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_link = link_path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

    // Leftover from an interrupted run.
    let _ = fs::remove_file(&temp_link);

    symlink(target, &temp_link).map_err(|e| SysextError::WriteFailed {
        path: temp_link.clone(),
        source: e,
    })?;

    fs::rename(&temp_link, link_path).map_err(|e| {
        let _ = fs::remove_file(&temp_link);
        SysextError::WriteFailed {
            path: link_path.to_path_buf(),
            source: e,
        }
    })
}
