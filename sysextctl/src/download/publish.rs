//! Write-to-temp-then-rename publication.
//!
//! Data is streamed into a temporary file in the destination directory and
//! only renamed onto the final path once complete, so the final path either
//! does not exist or holds a complete file.

use std::fs;
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::checksum::BUFFER_SIZE;
use crate::context::OpContext;
use crate::error::{SysextError, SysextResult};

/// Mode of published files.
pub(crate) const FILE_MODE: u32 = 0o644;

/// Create `dir` and its parents.
pub(crate) fn ensure_dir(dir: &Path) -> SysextResult<()> {
    fs::create_dir_all(dir).map_err(|e| SysextError::CreateDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// A fully written, flushed temporary file and the SHA-256 of its content.
pub(crate) struct StagedFile {
    file: NamedTempFile,
    pub digest: String,
    pub bytes: u64,
}

impl StagedFile {
    /// Atomically move the staged file onto `target`.
    pub fn publish(self, target: &Path) -> SysextResult<()> {
        self.file
            .persist(target)
            .map_err(|e| SysextError::WriteFailed {
                path: target.to_path_buf(),
                source: e.error,
            })?;
        Ok(())
    }
}

/// Stream `body` into a temporary file in `dir`, hashing as it goes.
///
/// The context is checked between chunks. On any error the temporary file is
/// removed when dropped.
pub(crate) fn stage<R: Read + ?Sized>(
    dir: &Path,
    body: &mut R,
    source_url: &str,
    ctx: &OpContext,
    mut on_chunk: impl FnMut(u64),
) -> SysextResult<StagedFile> {
    let mut file = tempfile::Builder::new()
        .prefix(".download-")
        .tempfile_in(dir)
        .map_err(|e| SysextError::WriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
    let temp_path = file.path().to_path_buf();
    let write_failed = |e| SysextError::WriteFailed {
        path: temp_path.clone(),
        source: e,
    };

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut written = 0u64;

    loop {
        ctx.check()?;
        let bytes_read = body
            .read(&mut buffer)
            .map_err(|e| SysextError::DownloadFailed {
                url: source_url.to_string(),
                reason: format!("read error: {}", e),
            })?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read]).map_err(write_failed)?;
        hasher.update(&buffer[..bytes_read]);
        written += bytes_read as u64;
        on_chunk(written);
    }

    file.flush().map_err(write_failed)?;
    file.as_file().sync_all().map_err(write_failed)?;
    file.as_file()
        .set_permissions(fs::Permissions::from_mode(FILE_MODE))
        .map_err(write_failed)?;

    Ok(StagedFile {
        file,
        digest: hex::encode(hasher.finalize()),
        bytes: written,
    })
}
