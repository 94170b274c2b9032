use std::io::ErrorKind;
use std::path::Path;

use tokio::fs::{self, OpenOptions};
use tracing::{debug, error, info, warn};

use super::validation::original_extension;
use super::{upload_dir, UploadError, UploadedFile};
use crate::hash::hash_file;
use crate::paths::PathResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// The file now lives under its content-addressed name.
    Stored,
    /// Identical content was already stored; the temporary file was discarded.
    Existing,
}

/// Deduplicate every file concurrently. A file that fails keeps its temporary path.
pub async fn deduplicate(files: Vec<UploadedFile>, paths: &PathResolver) -> Vec<UploadedFile> {
    futures::future::join_all(files.into_iter().map(|mut file| async move {
        if let Err(e) = deduplicate_file(&mut file, paths).await {
            error!(filename = %file.original_name, error = %e, "File deduplication failed");
        }
        file
    }))
    .await
}

/// Move one received file to `<hash><ext>`, or discard it when that name is taken.
pub async fn deduplicate_file(
    file: &mut UploadedFile,
    paths: &PathResolver,
) -> Result<DedupOutcome, UploadError> {
    let hash = hash_file(&file.path).await?;
    let filename = format!("{hash}{}", original_extension(&file.original_name));

    let dir = upload_dir(paths, &file.field_name)?;
    fs::create_dir_all(&dir).await?;
    let destination = paths.validate_file_path(dir.join(&filename))?;

    let outcome = claim(&file.path, &destination).await?;
    match outcome {
        DedupOutcome::Stored => info!(filename = %filename, "Stored new upload"),
        DedupOutcome::Existing => info!(filename = %filename, "File already exists, reusing stored copy"),
    }

    file.filename = filename;
    file.path = destination;
    file.content_hash = Some(hash);
    Ok(outcome)
}

/// Place `temp` at `destination` unless something already occupies it.
/// The name is claimed atomically, so concurrent identical uploads store one copy.
async fn claim(temp: &Path, destination: &Path) -> std::io::Result<DedupOutcome> {
    match fs::hard_link(temp, destination).await {
        Ok(()) => {
            fs::remove_file(temp).await?;
            Ok(DedupOutcome::Stored)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            fs::remove_file(temp).await?;
            Ok(DedupOutcome::Existing)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Err(e),
        Err(e) => {
            debug!(error = %e, "Hard link unavailable, copying instead");
            copy_exclusive(temp, destination).await
        }
    }
}

async fn copy_exclusive(temp: &Path, destination: &Path) -> std::io::Result<DedupOutcome> {
    let mut source = fs::File::open(temp).await?;

    let mut target = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .await
    {
        Ok(target) => target,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            drop(source);
            fs::remove_file(temp).await?;
            return Ok(DedupOutcome::Existing);
        }
        Err(e) => return Err(e),
    };

    let copied = async {
        tokio::io::copy(&mut source, &mut target).await?;
        target.sync_all().await
    }
    .await;

    // A partial file under the content name would be served as every later copy.
    if let Err(e) = copied {
        drop(target);
        if let Err(cleanup) = fs::remove_file(destination).await {
            warn!(path = %destination.display(), error = %cleanup, "Failed to remove partial copy");
        }
        return Err(e);
    }

    drop(source);
    if let Err(e) = fs::remove_file(temp).await {
        warn!(path = %temp.display(), error = %e, "Stored upload but failed to remove temporary file");
    }
    Ok(DedupOutcome::Stored)
}
