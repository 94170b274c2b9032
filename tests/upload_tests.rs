mod common;

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use common::{
    get, json_request, multipart_request, send, state_with, stored_files, MockConnector, Part,
};
use ovenly_api::api::routes::create_router;
use ovenly_api::bootstrap;
use ovenly_api::hash::hash_bytes;
use ovenly_api::paths::{PathError, PathResolver};
use ovenly_api::uploads::{deduplicate_file, remove_upload, DedupOutcome, UploadError, UploadedFile};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";

async fn ready_app(temp_dir: &tempfile::TempDir) -> axum::Router {
    let state = state_with(temp_dir, Arc::new(MockConnector::default()));
    state.init.start(bootstrap::initialize(Arc::clone(&state)));
    state.init.wait().await.unwrap();
    create_router(state)
}

#[tokio::test]
async fn test_identical_uploads_share_one_stored_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let app = ready_app(&temp_dir).await;
    let expected = format!("{}.png", hash_bytes(PNG_BYTES));

    let (status, first) = send(
        &app,
        multipart_request("/api/uploads", &[Part::file("uploads", "cat.png", "image/png", PNG_BYTES)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["status"], "success");
    assert_eq!(first["data"]["files"][0]["filename"], expected.as_str());
    assert_eq!(first["data"]["files"][0]["originalname"], "cat.png");
    assert_eq!(first["data"]["files"][0]["fieldname"], "uploads");
    assert_eq!(first["data"]["files"][0]["size"], PNG_BYTES.len());
    assert_eq!(
        first["data"]["files"][0]["url"],
        format!("http://localhost/uploads/{expected}").as_str()
    );

    let (status, second) = send(
        &app,
        multipart_request("/api/uploads", &[Part::file("uploads", "copy.png", "image/png", PNG_BYTES)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["files"][0]["filename"], expected.as_str());

    // One content-addressed file, no temporaries left behind.
    assert_eq!(stored_files(&temp_dir), vec![expected.clone()]);

    let response = send(&app, get(&format!("/uploads/{expected}"))).await;
    assert_eq!(response.0, StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_field_name_is_rejected_without_writing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let app = ready_app(&temp_dir).await;

    let (status, body) = send(
        &app,
        multipart_request("/api/uploads", &[Part::file("file", "cat.png", "image/png", PNG_BYTES)]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["data"]["message"],
        "Invalid fieldname: \"file\". Fieldname must be \"uploads\""
    );
    assert!(stored_files(&temp_dir).is_empty());
}

#[tokio::test]
async fn test_invalid_uploads_are_rejected_and_cleaned_up() {
    let temp_dir = tempfile::tempdir().unwrap();
    let app = ready_app(&temp_dir).await;

    // Disallowed MIME type
    let (status, _) = send(
        &app,
        multipart_request("/api/uploads", &[Part::file("uploads", "page.html", "text/html", b"<p>")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Extension does not match the MIME type
    let (status, body) = send(
        &app,
        multipart_request("/api/uploads", &[Part::file("uploads", "cat.exe", "image/png", PNG_BYTES)]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["message"], "File extension does not match MIME type: image/png");

    // Second part too large: the first part must not survive either
    let large = vec![0u8; 64 * 1024 + 1];
    let (status, body) = send(
        &app,
        multipart_request(
            "/api/uploads",
            &[
                Part::file("uploads", "small.png", "image/png", PNG_BYTES),
                Part::file("uploads", "large.png", "image/png", &large),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["data"]["message"], "File too large. Maximum size: 64KB");

    // More files than allowed
    let parts: Vec<Part> = (0..4)
        .map(|_| Part::file("uploads", "cat.png", "image/png", PNG_BYTES))
        .collect();
    let (status, body) = send(&app, multipart_request("/api/uploads", &parts)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["message"], "Too many files. Maximum: 3 files");

    // No file parts at all
    let (status, body) = send(
        &app,
        multipart_request(
            "/api/uploads",
            &[Part {
                field: "note",
                filename: None,
                content_type: "text/plain",
                data: b"hello",
            }],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["message"], "No files uploaded");

    assert!(stored_files(&temp_dir).is_empty());
}

#[tokio::test]
async fn test_traversal_is_rejected_before_any_mutation() {
    let temp_dir = tempfile::tempdir().unwrap();
    let paths = PathResolver::new(temp_dir.path());
    let secret = temp_dir.path().join("secret.txt");
    std::fs::write(&secret, b"keep me").unwrap();
    std::fs::create_dir_all(paths.uploads_root()).unwrap();

    let err = remove_upload(&paths, "../secret.txt").await.unwrap_err();
    assert!(matches!(err, UploadError::Path(PathError::OutsideUploads(_))));
    assert!(secret.exists());

    let err = remove_upload(&paths, "a/../../secret.txt").await.unwrap_err();
    assert!(matches!(err, UploadError::Path(_)));
    assert!(secret.exists());

    assert!(remove_upload(&paths, ".").await.is_err());
    assert!(paths.uploads_root().exists());
}

#[tokio::test]
async fn test_deleting_last_file_removes_its_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let paths = PathResolver::new(temp_dir.path());
    let dir = paths.uploads_root().join("avatars");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("a.png"), b"a").unwrap();
    std::fs::write(dir.join("b.png"), b"b").unwrap();

    remove_upload(&paths, "avatars/a.png").await.unwrap();
    assert!(dir.exists());
    assert!(dir.join("b.png").exists());

    remove_upload(&paths, "avatars/b.png").await.unwrap();
    assert!(!dir.exists());

    // Already absent counts as removed.
    remove_upload(&paths, "avatars/b.png").await.unwrap();
}

#[tokio::test]
async fn test_delete_endpoint_reports_per_file_results() {
    let temp_dir = tempfile::tempdir().unwrap();
    let app = ready_app(&temp_dir).await;
    let root = temp_dir.path().join("uploads");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("one.png"), b"1").unwrap();
    std::fs::write(root.join("two.png"), b"2").unwrap();

    let (status, body) = send(
        &app,
        json_request("DELETE", "/api/uploads", json!({"files": ["one.png", "../escape.png"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["successful"], 1);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["errors"][0]["filename"], "../escape.png");
    assert!(!root.join("one.png").exists());

    let (status, body) = send(
        &app,
        json_request("DELETE", "/api/uploads", json!({"files": ["two.png"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Successfully deleted 1 file(s).");
    assert!(body["data"].get("errors").is_none());
    // Last file gone, so the uploads directory is gone too.
    assert!(!root.exists());

    let (status, body) = send(&app, json_request("DELETE", "/api/uploads", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["errors"][0]["field"], "files");

    let (status, _) = send(&app, json_request("DELETE", "/api/uploads", json!({"files": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn received(paths: &PathResolver, name: &str, data: &[u8]) -> UploadedFile {
    let root = paths.uploads_root();
    std::fs::create_dir_all(&root).unwrap();
    let path: PathBuf = root.join(name);
    std::fs::write(&path, data).unwrap();
    UploadedFile {
        field_name: "uploads".into(),
        original_name: "report.pdf".into(),
        mime_type: "application/pdf".into(),
        size: data.len() as u64,
        filename: name.into(),
        path,
        content_hash: None,
    }
}

#[tokio::test]
async fn test_concurrent_identical_files_store_one_copy() {
    let temp_dir = tempfile::tempdir().unwrap();
    let paths = PathResolver::new(temp_dir.path());
    let mut first = received(&paths, "temp-1-a.pdf", b"%PDF-1.7 same");
    let mut second = received(&paths, "temp-2-b.pdf", b"%PDF-1.7 same");

    let (a, b) = tokio::join!(
        deduplicate_file(&mut first, &paths),
        deduplicate_file(&mut second, &paths)
    );
    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|o| *o == DedupOutcome::Existing);
    assert_eq!(outcomes, vec![DedupOutcome::Stored, DedupOutcome::Existing]);

    assert_eq!(first.path, second.path);
    assert_eq!(first.content_hash, second.content_hash);
    assert_eq!(stored_files(&temp_dir), vec![first.filename.clone()]);
}

#[tokio::test]
async fn test_failed_dedup_keeps_temporary_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let paths = PathResolver::new(temp_dir.path());
    let mut file = received(&paths, "temp-3-c.pdf", b"%PDF");
    std::fs::remove_file(&file.path).unwrap();
    let temp_path = file.path.clone();

    assert!(deduplicate_file(&mut file, &paths).await.is_err());
    assert_eq!(file.path, temp_path);
    assert!(file.content_hash.is_none());
}
