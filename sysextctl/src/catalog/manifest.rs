//! `SHA256SUMS` manifest parsing.
//!
//! Each non-blank line is `<64 hex digest>  <extension>-<version>-<arch>.raw`.
//! The extension may itself contain hyphens; the version may not, so the
//! split happens at the last hyphen once the architecture suffix is gone.

use super::Architecture;
use crate::error::{SysextError, SysextResult};

/// Suffix every extension image carries.
pub const ARTIFACT_SUFFIX: &str = ".raw";

/// Length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// One validated manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    /// Lowercase hex digest.
    pub checksum: String,
    pub filename: String,
    pub extension: String,
    pub version: String,
    pub arch: Architecture,
}

/// Parse a manifest into records sorted by
/// `(extension asc, version desc, arch asc)`.
///
/// The descending version order is what downstream code treats as
/// "newest first".
///
/// # Arguments
///
/// * `data` - Raw `SHA256SUMS` bytes; blank lines are skipped
///
/// # Returns
///
/// One validated record per non-blank line.
///
/// # Errors
///
/// The first bad line, checked as field count (`MalformedManifest`), then
/// digest (`InvalidChecksum`), then filename (`MalformedFilename`). Each
/// carries the 1-based line number.
pub fn parse_manifest(data: &[u8]) -> SysextResult<Vec<ManifestRecord>> {
    let text = String::from_utf8_lossy(data);
    let mut records = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        records.push(parse_line(line, line_no)?);
    }

    sort_records(&mut records);
    Ok(records)
}

fn parse_line(line: &str, line_no: usize) -> SysextResult<ManifestRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [checksum, filename] = fields[..] else {
        return Err(SysextError::MalformedManifest { line: line_no });
    };

    if checksum.len() != DIGEST_HEX_LEN || hex::decode(checksum).is_err() {
        return Err(SysextError::InvalidChecksum {
            line: line_no,
            checksum: checksum.to_string(),
        });
    }

    let (extension, version, arch) =
        decompose_filename(filename).map_err(|reason| SysextError::MalformedFilename {
            line: line_no,
            filename: filename.to_string(),
            reason,
        })?;

    Ok(ManifestRecord {
        checksum: checksum.to_ascii_lowercase(),
        filename: filename.to_string(),
        extension,
        version,
        arch,
    })
}

/// Sort records the way the manifest parser hands them on.
pub(crate) fn sort_records(records: &mut [ManifestRecord]) {
    records.sort_by(|a, b| {
        a.extension
            .cmp(&b.extension)
            .then_with(|| b.version.cmp(&a.version))
            .then_with(|| a.arch.cmp(&b.arch))
    });
}

/// Split an image filename into `(extension, version, arch)`.
///
/// Returns a short reason on failure.
pub fn decompose_filename(
    filename: &str,
) -> Result<(String, String, Architecture), &'static str> {
    if filename.contains(['/', '\\']) {
        return Err("path separator in filename");
    }

    let base = filename
        .strip_suffix(ARTIFACT_SUFFIX)
        .ok_or("missing .raw")?;

    let (arch, rest) = Architecture::ALL
        .into_iter()
        .find_map(|arch| {
            base.strip_suffix(arch.as_str())
                .and_then(|rest| rest.strip_suffix('-'))
                .map(|rest| (arch, rest))
        })
        .ok_or("unknown architecture")?;

    let rest = rest.strip_suffix('-').unwrap_or(rest);
    let (extension, version) = rest
        .rsplit_once('-')
        .ok_or("missing version separator")?;

    if extension.is_empty() || version.is_empty() {
        return Err("empty extension or version");
    }

    Ok((extension.to_string(), version.to_string(), arch))
}

/// Build the image filename for `(extension, version, arch)`.
pub fn compose_filename(extension: &str, version: &str, arch: Architecture) -> String {
    format!("{}-{}-{}{}", extension, version, arch, ARTIFACT_SUFFIX)
}
