//! Configuration for catalog fetching and extension staging.
//!
//! [`SysextConfig`] is built once per invocation and passed by reference to
//! every entry point. Values come from, in increasing precedence, the
//! built-in defaults, the optional INI file (see [`ConfigFile`]), and
//! whatever the caller applies on top through the `with_*` builders.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use url::Url;

use crate::error::{SysextError, SysextResult};

/// Release download prefix of the extension bakery.
pub const DEFAULT_MANIFEST_BASE_URL: &str =
    "https://github.com/flatcar/sysext-bakery/releases/download";

/// Host serving extension images and sysupdate configs.
pub const DEFAULT_ASSET_BASE_URL: &str = "https://extensions.flatcar.org";

/// Manifest filename published with every release.
pub const MANIFEST_FILENAME: &str = "SHA256SUMS";

/// Default HTTP request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "sysextctl";

/// Configuration threaded through catalog, download and render operations.
#[derive(Debug, Clone)]
pub struct SysextConfig {
    /// Filesystem root that extensions are staged under.
    pub root: PathBuf,

    /// Prefix for release-tag manifest URLs.
    pub manifest_base_url: Url,

    /// Host serving images and sysupdate configs.
    pub asset_base_url: Url,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// User agent for outgoing requests.
    pub user_agent: String,
}

impl Default for SysextConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            manifest_base_url: Url::parse(DEFAULT_MANIFEST_BASE_URL)
                .expect("default manifest URL is valid"),
            asset_base_url: Url::parse(DEFAULT_ASSET_BASE_URL).expect("default asset URL is valid"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SysextConfig {
    /// Create a configuration staging under the given root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::default().with_root(root)
    }

    /// Set the filesystem root. An empty path means `/`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.root = if root.as_os_str().is_empty() {
            PathBuf::from("/")
        } else {
            root
        };
        self
    }

    /// Set the manifest base URL.
    pub fn with_manifest_base_url(mut self, url: &str) -> SysextResult<Self> {
        self.manifest_base_url = parse_base_url(url)?;
        Ok(self)
    }

    /// Set the asset base URL.
    pub fn with_asset_base_url(mut self, url: &str) -> SysextResult<Self> {
        self.asset_base_url = parse_base_url(url)?;
        Ok(self)
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Manifest URL for a release tag. The tag is escaped as one path segment.
    pub fn release_manifest_url(&self, tag: &str) -> String {
        join_segments(&self.manifest_base_url, &[tag, MANIFEST_FILENAME])
    }

    /// Manifest covering every published extension.
    pub fn global_manifest_url(&self) -> String {
        join_segments(
            &self.manifest_base_url,
            &[MANIFEST_FILENAME, MANIFEST_FILENAME],
        )
    }

    /// Canonical download location of an image.
    pub fn asset_url(&self, filename: &str) -> String {
        join_segments(&self.asset_base_url, &["extensions", filename])
    }

    /// Location of the sysupdate config for an extension.
    pub fn sysupdate_config_url(&self, extension: &str) -> String {
        self.asset_url(&format!("{}.conf", extension))
    }
}

fn parse_base_url(raw: &str) -> SysextResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| SysextError::InvalidConfig(format!("invalid URL {:?}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(SysextError::InvalidConfig(format!(
            "URL {:?} cannot be used as a base",
            raw
        )));
    }
    Ok(url)
}

fn join_segments(base: &Url, segments: &[&str]) -> String {
    let mut url = base.clone();
    // Base URLs are validated on construction, so this only fails for
    // cannot-be-a-base URLs which never reach here.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url.to_string()
}

/// Path of the user configuration file.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sysextctl").join("config.ini"))
}

/// Optional settings read from `config.ini`.
///
/// ```ini
/// [bakery]
/// manifest_base_url = https://github.com/flatcar/sysext-bakery/releases/download
/// asset_base_url = https://extensions.flatcar.org
///
/// [http]
/// timeout_secs = 30
/// user_agent = sysextctl
///
/// [download]
/// root = /
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub manifest_base_url: Option<String>,
    pub asset_base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub root: Option<PathBuf>,
}

impl ConfigFile {
    /// Load the user configuration file, or defaults if there is none.
    pub fn load() -> SysextResult<Self> {
        match config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> SysextResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SysextError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parse INI text.
    pub fn parse(content: &str) -> SysextResult<Self> {
        let ini = Ini::load_from_str(content)
            .map_err(|e| SysextError::InvalidConfig(format!("config.ini: {}", e)))?;

        let get = |section: &str, key: &str| -> Option<String> {
            ini.section(Some(section))
                .and_then(|s| s.get(key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let timeout_secs = get("http", "timeout_secs")
            .map(|v| {
                v.parse::<u64>().map_err(|_| {
                    SysextError::InvalidConfig(format!("http.timeout_secs: not a number: {}", v))
                })
            })
            .transpose()?;

        Ok(Self {
            manifest_base_url: get("bakery", "manifest_base_url"),
            asset_base_url: get("bakery", "asset_base_url"),
            timeout_secs,
            user_agent: get("http", "user_agent"),
            root: get("download", "root").map(PathBuf::from),
        })
    }

    /// Layer file values over a configuration.
    pub fn apply(&self, mut config: SysextConfig) -> SysextResult<SysextConfig> {
        if let Some(ref url) = self.manifest_base_url {
            config = config.with_manifest_base_url(url)?;
        }
        if let Some(ref url) = self.asset_base_url {
            config = config.with_asset_base_url(url)?;
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(ref agent) = self.user_agent {
            config = config.with_user_agent(agent.clone());
        }
        if let Some(ref root) = self.root {
            config = config.with_root(root.clone());
        }
        Ok(config)
    }
}
