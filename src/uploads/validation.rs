use std::path::Path;

use super::UploadError;

/// The only multipart field name accepted for files.
pub const UPLOADS_FIELD_NAME: &str = "uploads";

/// Extensions accepted for each allowed MIME type.
const MIME_EXTENSIONS: &[(&str, &[&str])] = &[
    ("image/jpeg", &["jpg", "jpeg"]),
    ("image/jpg", &["jpg", "jpeg"]),
    ("image/png", &["png"]),
    ("image/gif", &["gif"]),
    ("image/webp", &["webp"]),
    ("image/svg+xml", &["svg"]),
    ("application/pdf", &["pdf"]),
    ("application/msword", &["doc"]),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &["docx"],
    ),
    ("application/vnd.ms-excel", &["xls"]),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &["xlsx"],
    ),
];

pub fn validate_field_name(field_name: &str) -> Result<(), UploadError> {
    if field_name == UPLOADS_FIELD_NAME {
        Ok(())
    } else {
        Err(UploadError::InvalidFieldName(field_name.to_string()))
    }
}

pub fn validate_mime_type(mime_type: &str, allowed: &[String]) -> Result<(), UploadError> {
    if allowed.iter().any(|m| m == mime_type) {
        Ok(())
    } else {
        Err(UploadError::InvalidMimeType {
            mime_type: mime_type.to_string(),
            allowed: allowed.join(", "),
        })
    }
}

/// Whether `filename`'s extension is one the MIME type is known by.
pub fn validate_file_extension(filename: &str, mime_type: &str) -> bool {
    let ext = original_extension(filename)
        .trim_start_matches('.')
        .to_ascii_lowercase();
    MIME_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == mime_type)
        .is_some_and(|(_, extensions)| extensions.contains(&ext.as_str()))
}

/// Extension of a client-supplied file name including the dot, or "" when it has none.
pub fn original_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}
