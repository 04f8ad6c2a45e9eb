//! On-disk side of a fetch: existing-file check, validation, final rename.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use super::FetchError;
use crate::parser::Identifier;

/// Size of an artifact already at `path`, if one exists.
pub(super) async fn existing_size(path: &Path) -> Option<u64> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    metadata.is_file().then(|| metadata.len())
}

/// Removes `path`, ignoring a file that is already gone.
pub(super) async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial artifact"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial artifact"),
    }
}

/// Validates the downloaded `partial` file and moves it to `final_path`.
///
/// Rejected or unmovable files are deleted, so nothing a later run would
/// mistake for a finished artifact is left behind.
pub(super) async fn validate_and_persist(
    partial: &Path,
    final_path: &Path,
    bytes_written: u64,
    magic: &[u8],
) -> Result<u64, FetchError> {
    if bytes_written == 0 {
        remove_quietly(partial).await;
        return Err(FetchError::EmptyDownload);
    }

    if !starts_with_magic(partial, magic).await {
        remove_quietly(partial).await;
        return Err(FetchError::InvalidFormat);
    }

    if let Err(e) = tokio::fs::rename(partial, final_path).await {
        remove_quietly(partial).await;
        return Err(FetchError::file_write(final_path, e));
    }
    Ok(bytes_written)
}

async fn starts_with_magic(path: &Path, magic: &[u8]) -> bool {
    let Ok(mut file) = tokio::fs::File::open(path).await else {
        return false;
    };
    let mut head = vec![0u8; magic.len()];
    match file.read_exact(&mut head).await {
        Ok(_) => head == magic,
        Err(_) => false,
    }
}

/// Saves a page without an artifact link for later inspection.
pub(super) async fn write_debug_page(dir: &Path, identifier: &Identifier, html: &str) -> Option<PathBuf> {
    let path = dir.join(format!("{}.html", identifier.file_stem()));
    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, html).await
    }
    .await;
    match result {
        Ok(()) => Some(path),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to save debug page");
            None
        }
    }
}
