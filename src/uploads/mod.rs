//! Multipart upload reception, content-addressed storage and deletion.

mod dedup;
mod receive;
mod remove;
mod validation;

use std::path::PathBuf;

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::api::response::ApiError;
use crate::paths::{PathError, PathResolver};

pub use dedup::{deduplicate, deduplicate_file, DedupOutcome};
pub use receive::{receive_files, upload_any, ReceivedForm};
pub use remove::remove_upload;
pub use validation::{
    original_extension, validate_field_name, validate_file_extension, validate_mime_type,
    UPLOADS_FIELD_NAME,
};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid fieldname: \"{0}\". Fieldname must be \"uploads\"")]
    InvalidFieldName(String),
    #[error("Invalid file type. Allowed types: {allowed}")]
    InvalidMimeType { mime_type: String, allowed: String },
    #[error("File extension does not match MIME type: {0}")]
    ExtensionMismatch(String),
    /// Carries the limit in bytes.
    #[error("File too large. Maximum size: {}", format_size(*.0))]
    FileTooLarge(u64),
    #[error("Too many files. Maximum: {0} files")]
    TooManyFiles(usize),
    #[error("No files uploaded")]
    NoFiles,
    #[error("Invalid file name: \"{0}\"")]
    InvalidFileName(String),
    #[error("Invalid multipart data: {1}")]
    Multipart(StatusCode, String),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::FileTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Multipart(status, _) => *status,
            UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        let status = e.status();
        if status.is_server_error() {
            ApiError::Error(status, e.to_string(), None)
        } else {
            ApiError::Fail(status, e.to_string())
        }
    }
}

/// Human-readable byte count: whole MB or KB where exact, bytes otherwise.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{bytes} bytes")
    }
}

/// One received file. Starts at its temporary path; after deduplication it
/// points at the content-addressed file.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    #[serde(rename = "fieldname")]
    pub field_name: String,
    #[serde(rename = "originalname")]
    pub original_name: String,
    #[serde(rename = "mimetype")]
    pub mime_type: String,
    pub size: u64,
    /// Name on disk, relative to the uploads directory
    pub filename: String,
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl UploadedFile {
    /// Public URL under `base_url`, e.g. `http://localhost:3000/uploads/<filename>`.
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{UPLOADS_FIELD_NAME}/{}",
            base_url.trim_end_matches('/'),
            self.filename.trim_start_matches('/')
        )
    }

    pub fn is_deduplicated(&self) -> bool {
        self.content_hash.is_some()
    }
}

/// Directory that stores files sent under `field_name`. Files live directly in
/// the uploads root; the field name is validated but not part of the path.
pub fn upload_dir(paths: &PathResolver, field_name: &str) -> Result<PathBuf, UploadError> {
    validate_field_name(field_name)?;
    Ok(paths.uploads_root())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_duplicate_slashes() {
        let file = UploadedFile {
            field_name: "uploads".into(),
            original_name: "cat.png".into(),
            mime_type: "image/png".into(),
            size: 3,
            filename: "abc.png".into(),
            path: PathBuf::from("/tmp/uploads/abc.png"),
            content_hash: Some("abc".into()),
        };
        assert_eq!(file.url("http://localhost:3000/"), "http://localhost:3000/uploads/abc.png");
    }

    #[test]
    fn test_upload_dir_requires_uploads_field() {
        let paths = PathResolver::new("/srv/app");
        assert_eq!(upload_dir(&paths, "uploads").unwrap(), PathBuf::from("/srv/app/uploads"));
        assert!(matches!(
            upload_dir(&paths, "file"),
            Err(UploadError::InvalidFieldName(_))
        ));
    }

    #[test]
    fn test_size_error_is_payload_too_large() {
        assert_eq!(UploadError::FileTooLarge(10).status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            UploadError::FileTooLarge(64 * 1024).to_string(),
            "File too large. Maximum size: 64KB"
        );
        assert_eq!(
            UploadError::FileTooLarge(10 * 1024 * 1024).to_string(),
            "File too large. Maximum size: 10MB"
        );
        assert_eq!(format_size(1500), "1500 bytes");
        assert_eq!(UploadError::NoFiles.status(), StatusCode::BAD_REQUEST);
    }
}
