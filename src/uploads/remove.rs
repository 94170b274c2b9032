use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};

use super::UploadError;
use crate::paths::PathResolver;

/// Delete a stored upload by name, relative to the uploads root.
///
/// The path is validated before anything is touched. A file that is already
/// gone counts as deleted. The containing directory is removed once empty.
pub async fn remove_upload(paths: &PathResolver, filename: &str) -> Result<(), UploadError> {
    let root = paths.uploads_root();
    let path = paths.validate_file_path(root.join(filename))?;
    if path == root {
        return Err(UploadError::InvalidFileName(filename.to_string()));
    }

    match tokio::fs::remove_file(&path).await {
        Ok(()) => info!(filename, "Removed upload"),
        Err(e) if e.kind() == ErrorKind::NotFound => debug!(filename, "Upload already absent"),
        Err(e) => return Err(e.into()),
    }

    if let Some(parent) = path.parent() {
        if remove_dir_if_empty(parent).await? {
            debug!(dir = %parent.display(), "Removed empty upload directory");
        }
    }
    Ok(())
}

async fn remove_dir_if_empty(dir: &Path) -> std::io::Result<bool> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if entries.next_entry().await?.is_some() {
        return Ok(false);
    }

    match tokio::fs::remove_dir(dir).await {
        Ok(()) => Ok(true),
        // Another request may have removed it, or written into it, meanwhile.
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty) => Ok(false),
        Err(e) => Err(e),
    }
}
