use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::validators::RemoveFilesRequest;
use crate::api::response::{ApiError, JSend};
use crate::api::validate::{field_error, validation_failed};
use crate::routing::Http;
use crate::uploads::{remove_upload, UploadedFile, UPLOADS_FIELD_NAME};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadedFileResponse {
    pub fieldname: String,
    pub originalname: String,
    pub mimetype: String,
    pub filename: String,
    pub size: u64,
    pub url: String,
}

impl UploadedFileResponse {
    fn from_file(file: &UploadedFile, base_url: &str) -> Self {
        Self {
            fieldname: file.field_name.clone(),
            originalname: file.original_name.clone(),
            mimetype: file.mime_type.clone(),
            filename: file.filename.clone(),
            size: file.size,
            url: file.url(base_url),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadFilesResponse {
    pub message: String,
    pub files: Vec<UploadedFileResponse>,
}

#[derive(Debug, Serialize)]
pub struct RemoveFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RemoveFilesResponse {
    pub success: bool,
    pub message: String,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RemoveFailure>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Route: POST /uploads (after the upload middleware)
pub async fn upload_files(http: Http) -> Result<Response, ApiError> {
    let files = http.files(Some(UPLOADS_FIELD_NAME));
    if files.is_empty() {
        return Err(ApiError::bad_request("Files are required"));
    }

    let base_url = http.base_url();
    let files = files
        .into_iter()
        .map(|file| UploadedFileResponse::from_file(file, &base_url))
        .collect();

    Ok(JSend::success(UploadFilesResponse {
        message: "Files uploaded".to_string(),
        files,
    })
    .into_response())
}

/// Route: DELETE /uploads
///
/// Every file is attempted; the response is 200 only when all deletions succeed.
pub async fn remove_files(http: Http) -> Response {
    let request: RemoveFilesRequest = match http.parse() {
        Ok(request) => request,
        Err(e) => return validation_failed(vec![field_error(&e)]),
    };

    if request.files.is_empty() {
        return ApiError::bad_request("No files provided. Use 'files' as an array of filenames.")
            .into_response();
    }

    let paths = &http.state().paths;
    let results = futures::future::join_all(request.files.iter().map(|filename| async move {
        remove_upload(paths, filename)
            .await
            .map_err(|e| RemoveFailure {
                filename: filename.clone(),
                error: format!("Failed to remove file \"{filename}\": {e}"),
            })
    }))
    .await;

    let total = results.len();
    let errors: Vec<RemoveFailure> = results.into_iter().filter_map(Result::err).collect();
    let failed = errors.len();
    let successful = total - failed;

    let body = RemoveFilesResponse {
        success: failed == 0,
        message: if failed == 0 {
            format!("Successfully deleted {total} file(s).")
        } else {
            format!("Deleted {successful} file(s), {failed} failed.")
        },
        total,
        successful,
        failed,
        errors,
    };

    if failed == 0 {
        JSend::success(body).into_response()
    } else {
        (StatusCode::BAD_REQUEST, JSend::fail(body)).into_response()
    }
}
