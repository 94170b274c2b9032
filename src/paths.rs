//! Writable base directory resolution and the uploads anti-traversal check.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Directory (relative to the base directory) that holds every stored upload.
pub const UPLOADS_DIR: &str = "uploads";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Invalid path: File path is outside allowed uploads directory")]
    OutsideUploads(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    base: PathBuf,
}

impl PathResolver {
    /// Use `base` as the writable base directory. Relative bases are anchored at the
    /// current working directory.
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        let base = base.as_ref();
        let absolute = std::path::absolute(base).unwrap_or_else(|_| base.to_path_buf());
        Self {
            base: lexical_resolve(&absolute, Path::new("")),
        }
    }

    /// Temp directory on serverless filesystems, working directory otherwise.
    pub fn from_environment(serverless: bool) -> Result<Self, PathError> {
        let base = if serverless {
            std::env::temp_dir()
        } else {
            std::env::current_dir()?
        };
        Ok(Self::new(base))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn uploads_root(&self) -> PathBuf {
        self.base.join(UPLOADS_DIR)
    }

    /// Resolve `path` (relative paths against the base directory) without touching the filesystem.
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        lexical_resolve(&self.base, path.as_ref())
    }

    pub fn is_within_uploads<P: AsRef<Path>>(&self, path: P) -> bool {
        self.resolve(path).starts_with(self.uploads_root())
    }

    /// Returns the resolved path, or an error when it escapes the uploads directory.
    pub fn validate_file_path<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf, PathError> {
        let resolved = self.resolve(path.as_ref());
        if resolved.starts_with(self.uploads_root()) {
            Ok(resolved)
        } else {
            Err(PathError::OutsideUploads(resolved))
        }
    }

    /// Create the uploads directory if missing and return it.
    pub async fn ensure_uploads_root(&self) -> Result<PathBuf, PathError> {
        let root = self.uploads_root();
        tokio::fs::create_dir_all(&root).await?;
        Ok(root)
    }
}

/// Joins `path` onto `base` and folds `.`/`..` components lexically.
fn lexical_resolve(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(segment) => resolved.push(segment),
        }
    }
    resolved
}
