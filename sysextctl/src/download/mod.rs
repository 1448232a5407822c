//! Verified download and placement of extension images.
//!
//! For one [`Asset`] the [`Downloader`] produces:
//!
//! ```text
//! <root>/opt/extensions/<ext>/<name>           image, SHA-256 verified
//! <root>/etc/extensions/<ext>.raw              -> /opt/extensions/<ext>/<name>
//! <root>/etc/sysupdate.<ext>.d/<ext>.conf      sysupdate config
//! ```
//!
//! Every file is written to a temporary file beside its final path and
//! renamed into place only when complete.

mod checksum;
mod publish;
mod symlink;

pub use checksum::{calculate_file_checksum, file_matches_checksum};
pub use symlink::{activation_link_path, ensure_symlink, staged_image_path};

use std::path::{Path, PathBuf};

use crate::catalog::Asset;
use crate::config::SysextConfig;
use crate::context::OpContext;
use crate::error::{SysextError, SysextResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse, ERROR_BODY_LIMIT};

use publish::{ensure_dir, stage};

/// Callback for download progress: `(bytes_downloaded, total_bytes)`.
///
/// `total_bytes` is 0 when the server does not report a length.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Per-call download options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Filesystem root to stage under.
    pub root: PathBuf,

    /// Re-download even if a verified image is already present.
    pub force: bool,

    /// Place the sysupdate config.
    pub with_config: bool,

    /// Maintain the activation symlink.
    pub with_symlink: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            force: false,
            with_config: true,
            with_symlink: true,
        }
    }
}

impl DownloadOptions {
    /// Defaults with the root taken from the configuration.
    pub fn from_config(config: &SysextConfig) -> Self {
        Self::default().with_root(config.root.clone())
    }

    /// Set the root. An empty path means `/`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.root = if root.as_os_str().is_empty() {
            PathBuf::from("/")
        } else {
            root
        };
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_config(mut self, with_config: bool) -> Self {
        self.with_config = with_config;
        self
    }

    pub fn with_symlink(mut self, with_symlink: bool) -> Self {
        self.with_symlink = with_symlink;
        self
    }
}

/// What a download placed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Final path of the image.
    pub target: PathBuf,

    /// Whether the image was fetched, as opposed to already present.
    pub fetched: bool,

    /// Activation symlink, if maintained.
    pub symlink: Option<PathBuf>,

    /// Sysupdate config, if placed.
    pub config: Option<PathBuf>,
}

/// Directory holding the images of one extension.
pub fn image_dir(root: &Path, extension: &str) -> PathBuf {
    root.join("opt").join("extensions").join(extension)
}

/// Final path of an asset's image under `root`.
pub fn image_path(root: &Path, asset: &Asset) -> PathBuf {
    image_dir(root, &asset.extension).join(&asset.name)
}

/// Path of the sysupdate config for an extension under `root`.
pub fn sysupdate_config_path(root: &Path, extension: &str) -> PathBuf {
    root.join("etc")
        .join(format!("sysupdate.{}.d", extension))
        .join(format!("{}.conf", extension))
}

/// Downloads and places extension images.
pub struct Downloader<'a> {
    client: &'a dyn HttpClient,
    config: &'a SysextConfig,
    progress: Option<ProgressCallback>,
}

impl<'a> Downloader<'a> {
    pub fn new(client: &'a dyn HttpClient, config: &'a SysextConfig) -> Self {
        Self {
            client,
            config,
            progress: None,
        }
    }

    /// Report image download progress through `callback`.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Download, verify and place one asset.
    ///
    /// Steps run in order and the first failure aborts the rest. A verified
    /// image already at the target is not fetched again unless `force` is
    /// set; the symlink and config steps still run.
    ///
    /// # Arguments
    ///
    /// * `asset` - Resolved asset to place
    /// * `options` - Target root and which placement steps to run
    /// * `ctx` - Cancellation and deadline for the network calls
    ///
    /// # Returns
    ///
    /// Where the image, symlink and sysupdate config ended up, and whether
    /// the image was fetched.
    ///
    /// # Errors
    ///
    /// * `DownloadFailed` - transport error or non-200 response
    /// * `ChecksumMismatch` - the fetched image does not match `asset.checksum`
    /// * `ConflictingSymlinkTarget` - a non-symlink sits at the activation path
    /// * `Cancelled` / `DeadlineExceeded` - the context stopped the transfer
    pub fn download(
        &self,
        asset: &Asset,
        options: &DownloadOptions,
        ctx: &OpContext,
    ) -> SysextResult<DownloadOutcome> {
        let target_dir = image_dir(&options.root, &asset.extension);
        ensure_dir(&target_dir)?;
        let target = target_dir.join(&asset.name);

        let fetched = if !options.force && file_matches_checksum(&target, &asset.checksum)? {
            tracing::debug!(
                target = %target.display(),
                "image already present with matching checksum, skipping download"
            );
            false
        } else {
            self.fetch_image(asset, &target_dir, &target, ctx)?;
            true
        };

        let symlink = if options.with_symlink {
            let link = ensure_symlink(&options.root, asset)?;
            tracing::debug!(link = %link.display(), "activation symlink in place");
            Some(link)
        } else {
            None
        };

        let config = if options.with_config {
            Some(self.place_sysupdate_config(&asset.extension, &options.root, ctx)?)
        } else {
            None
        };

        Ok(DownloadOutcome {
            target,
            fetched,
            symlink,
            config,
        })
    }

    fn fetch_image(
        &self,
        asset: &Asset,
        target_dir: &Path,
        target: &Path,
        ctx: &OpContext,
    ) -> SysextResult<()> {
        let mut response = self.get(&asset.download_url, ctx)?;
        let total = response.content_length.unwrap_or(0);

        let staged = stage(
            target_dir,
            &mut response.body,
            &asset.download_url,
            ctx,
            |downloaded| {
                if let Some(progress) = &self.progress {
                    progress(downloaded, total);
                }
            },
        )?;

        if !staged.digest.eq_ignore_ascii_case(&asset.checksum) {
            return Err(SysextError::ChecksumMismatch {
                filename: asset.name.clone(),
                expected: asset.checksum.to_lowercase(),
                actual: staged.digest,
            });
        }

        tracing::debug!(
            target = %target.display(),
            bytes = staged.bytes,
            "image verified"
        );
        staged.publish(target)
    }

    fn place_sysupdate_config(
        &self,
        extension: &str,
        root: &Path,
        ctx: &OpContext,
    ) -> SysextResult<PathBuf> {
        let url = self.config.sysupdate_config_url(extension);
        let path = sysupdate_config_path(root, extension);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        let mut response = self.get(&url, ctx)?;
        ensure_dir(&dir)?;
        let staged = stage(&dir, &mut response.body, &url, ctx, |_| {})?;
        staged.publish(&path)?;

        tracing::debug!(path = %path.display(), "sysupdate config in place");
        Ok(path)
    }

    /// GET `url`, turning anything but 200 into `DownloadFailed`.
    fn get(&self, url: &str, ctx: &OpContext) -> SysextResult<HttpResponse> {
        ctx.check()?;
        let response = self
            .client
            .send(&HttpRequest::get(url, self.config))
            .map_err(|e| SysextError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.is_ok() {
            let status = response.status;
            let excerpt = response.excerpt(ERROR_BODY_LIMIT);
            return Err(SysextError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}: {}", status, excerpt),
            });
        }
        Ok(response)
    }
}
