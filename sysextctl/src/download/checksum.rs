//! SHA-256 checksum calculation for on-disk images.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{SysextError, SysextResult};

/// Buffer size for reading files during checksum calculation (64KB).
pub(crate) const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the lowercase hex SHA-256 of a file.
pub fn calculate_file_checksum(path: &Path) -> SysextResult<String> {
    let read_failed = |e| SysextError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = File::open(path).map_err(read_failed)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(read_failed)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Whether a regular file exists at `path` with the given digest.
///
/// A missing file is `Ok(false)`; a directory in the way is an error.
pub fn file_matches_checksum(path: &Path, expected: &str) -> SysextResult<bool> {
    if expected.is_empty() {
        return Ok(false);
    }

    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => {
            return Err(SysextError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if metadata.is_dir() {
        return Err(SysextError::ReadFailed {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, "expected a file but found a directory"),
        });
    }

    let actual = calculate_file_checksum(path)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}
