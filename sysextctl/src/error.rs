//! Error types for catalog resolution and extension provisioning.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for sysextctl operations.
pub type SysextResult<T> = Result<T, SysextError>;

/// Errors that can occur while discovering, resolving or staging extensions.
///
/// None of these are retried internally; every variant is terminal for the
/// operation that raised it.
#[derive(Debug, Error)]
pub enum SysextError {
    /// A manifest line does not have exactly two fields.
    #[error("line {line}: malformed manifest entry")]
    MalformedManifest { line: usize },

    /// The digest field is not 64 hex characters.
    #[error("line {line}: invalid checksum {checksum:?}")]
    InvalidChecksum { line: usize, checksum: String },

    /// The filename cannot be decomposed into extension, version and architecture.
    #[error("line {line}: unexpected filename {filename:?} ({reason})")]
    MalformedFilename {
        line: usize,
        filename: String,
        reason: &'static str,
    },

    /// Fetching a manifest failed.
    #[error("fetch {url}: {}: {body}", status_text(.status))]
    FetchFailed {
        url: String,
        status: Option<u16>,
        body: String,
    },

    /// The catalog has no releases for the extension.
    #[error("unknown extension {extension:?}")]
    UnknownExtension { extension: String },

    /// No release of the extension matches the requested version.
    #[error("extension {extension} version {version} arch {arch} not found: no matching version")]
    VersionNotFound {
        extension: String,
        version: String,
        arch: String,
    },

    /// A matching release exists but does not publish the architecture.
    #[error("extension {extension} version {version} has no asset for arch {arch}")]
    ArchitectureNotFound {
        extension: String,
        version: String,
        arch: String,
    },

    /// Downloading an asset or auxiliary file failed.
    #[error("download {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The downloaded bytes do not hash to the published digest.
    #[error("checksum mismatch for {filename}: expected {expected} got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// Something other than a symlink occupies the activation link path.
    #[error("cannot overwrite non-symlink at {}", .path.display())]
    ConflictingSymlinkTarget { path: PathBuf },

    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", .path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// HTTP client construction or transport failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation ran past its deadline.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// An extension selection argument is invalid.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// An asset handed to the renderer carries a non-hex digest.
    #[error("decode checksum for {name}: {checksum:?} is not hex")]
    InvalidAssetChecksum { name: String, checksum: String },

    /// Rendering was requested without any assets.
    #[error("no system extensions supplied")]
    EmptySnippet,

    /// The Butane document could not be serialized.
    #[error("render Butane snippet: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Architecture token outside the recognized set.
    #[error("unknown architecture {0:?} (expected x86-64 or arm64)")]
    UnknownArchitecture(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn status_text(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => "transport error".to_string(),
    }
}

impl SysextError {
    /// Source line number for parser-stage errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedManifest { line }
            | Self::InvalidChecksum { line, .. }
            | Self::MalformedFilename { line, .. } => Some(*line),
            _ => None,
        }
    }
}
