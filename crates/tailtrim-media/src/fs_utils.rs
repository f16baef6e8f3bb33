//! Filesystem utilities for output and log directories.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Make sure `path` is a writable directory and return its absolute form.
///
/// The directory is created when missing and `create` is set. Writability
/// is checked by actually creating (and dropping) a temporary file in it,
/// which also catches read-only mounts that permission bits miss.
///
/// # Example
///
/// ```ignore
/// use tailtrim_media::fs_utils::ensure_dir_writable;
///
/// let out = ensure_dir_writable("trimmed", true).await?;
/// ```
pub async fn ensure_dir_writable(path: impl AsRef<Path>, create: bool) -> MediaResult<PathBuf> {
    let path = path.as_ref();
    let abs = std::path::absolute(path)?;

    if !abs.exists() {
        if !create {
            return Err(MediaError::FileNotFound(abs));
        }
        fs::create_dir_all(&abs).await?;
        tracing::debug!(path = %abs.display(), "Created directory");
    }

    if !abs.is_dir() {
        return Err(MediaError::DirectoryNotWritable(abs));
    }

    let probe_dir = abs.clone();
    let writable = tokio::task::spawn_blocking(move || tempfile::NamedTempFile::new_in(&probe_dir).is_ok())
        .await
        .unwrap_or(false);

    if !writable {
        return Err(MediaError::DirectoryNotWritable(abs));
    }

    Ok(abs)
}
