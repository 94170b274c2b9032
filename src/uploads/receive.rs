use std::path::Path;
use std::sync::Arc;

use axum::extract::multipart::{Field, Multipart};
use axum::extract::FromRequest;
use axum::response::IntoResponse;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::dedup::deduplicate;
use super::validation::{original_extension, validate_file_extension, validate_mime_type};
use super::{upload_dir, UploadError, UploadedFile};
use crate::api::response::ApiError;
use crate::config::UploadConfig;
use crate::paths::PathResolver;
use crate::routing::{Handler, Http, Next};

/// Files written to their temporary paths plus any plain form fields.
#[derive(Debug, Default)]
pub struct ReceivedForm {
    pub files: Vec<UploadedFile>,
    pub fields: Map<String, Value>,
}

/// Middleware that receives every file part, deduplicates the stored files and
/// hands them to the rest of the chain through [`Http::files`].
pub fn upload_any() -> Handler {
    Handler::middleware(|mut http: Http, next: Next| async move {
        let state = Arc::clone(http.state());
        let Some(request) = http.take_request() else {
            return ApiError::bad_request("Expected a multipart/form-data body").into_response();
        };

        let multipart = match Multipart::from_request(request, &()).await {
            Ok(multipart) => multipart,
            Err(rejection) => return ApiError::bad_request(rejection.body_text()).into_response(),
        };

        let form = match receive_files(multipart, &state.config.uploads, &state.paths).await {
            Ok(form) => form,
            Err(e) => {
                warn!(error = %e, "Upload rejected");
                return ApiError::from(e).into_response();
            }
        };

        let files = deduplicate(form.files, &state.paths).await;
        http.extend_fields(form.fields);
        http.set_files(files);
        next.run(http).await
    })
}

/// Stream every file part to a temporary file under the uploads directory.
///
/// Each part is validated before anything is written for it. On error, files
/// already written by this call are removed.
pub async fn receive_files(
    mut multipart: Multipart,
    config: &UploadConfig,
    paths: &PathResolver,
) -> Result<ReceivedForm, UploadError> {
    let mut form = ReceivedForm::default();

    if let Err(e) = read_parts(&mut multipart, config, paths, &mut form).await {
        cleanup_files(&form.files).await;
        return Err(e);
    }

    if form.files.is_empty() {
        return Err(UploadError::NoFiles);
    }
    Ok(form)
}

async fn read_parts(
    multipart: &mut Multipart,
    config: &UploadConfig,
    paths: &PathResolver,
    form: &mut ReceivedForm,
) -> Result<(), UploadError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.status(), e.body_text()))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        let Some(original_name) = field.file_name().map(|s| s.to_string()) else {
            let text = field
                .text()
                .await
                .map_err(|e| UploadError::Multipart(e.status(), e.body_text()))?;
            form.fields.insert(field_name, Value::String(text));
            continue;
        };

        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let dir = upload_dir(paths, &field_name)?;
        validate_mime_type(&mime_type, &config.allowed_mime_types)?;
        if !validate_file_extension(&original_name, &mime_type) {
            return Err(UploadError::ExtensionMismatch(mime_type));
        }
        if form.files.len() >= config.max_files {
            return Err(UploadError::TooManyFiles(config.max_files));
        }

        tokio::fs::create_dir_all(&dir).await?;
        let filename = temp_file_name(&original_name);
        let path = paths.validate_file_path(dir.join(&filename))?;

        let size = write_field(field, &path, config.max_file_size).await?;
        debug!(filename = %filename, original = %original_name, size, "Received upload");

        form.files.push(UploadedFile {
            field_name,
            original_name,
            mime_type,
            size,
            filename,
            path,
            content_hash: None,
        });
    }
    Ok(())
}

/// Copy one part to `path`, enforcing the size limit as bytes arrive.
async fn write_field(mut field: Field<'_>, path: &Path, max_size: u64) -> Result<u64, UploadError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut size: u64 = 0;

    let written: Result<(), UploadError> = async {
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| UploadError::Multipart(e.status(), e.body_text()))?
        {
            size += chunk.len() as u64;
            if size > max_size {
                return Err(UploadError::FileTooLarge(max_size));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = written {
        drop(file);
        remove_quietly(path).await;
        return Err(e);
    }
    Ok(size)
}

fn temp_file_name(original_name: &str) -> String {
    format!(
        "temp-{}-{}{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple(),
        original_extension(original_name)
    )
}

async fn cleanup_files(files: &[UploadedFile]) {
    futures::future::join_all(files.iter().map(|file| remove_quietly(&file.path))).await;
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial upload");
        }
    }
}
