//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use ovenly_api::config::{AppConfig, Config, DatabaseConfig, Environment, UploadConfig};
use ovenly_api::db::{
    matches_filter, Client, Collection, ConnectOptions, ConnectionTarget, Connector, DbError,
    Document, DocumentDb,
};
use ovenly_api::paths::PathResolver;
use ovenly_api::storage::RedbConnector;
use ovenly_api::AppState;

// ============================================================================
// In-memory driver
// ============================================================================

/// Connector that counts connections and hands out clients whose liveness
/// tests can switch off.
#[derive(Default)]
pub struct MockConnector {
    pub connects: AtomicUsize,
    pub clients: Mutex<Vec<Arc<MockClient>>>,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl MockConnector {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn latest_client(&self) -> Arc<MockClient> {
        Arc::clone(self.clients.lock().unwrap().last().expect("no client connected"))
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        _target: &ConnectionTarget,
        _options: &ConnectOptions,
    ) -> Result<Arc<dyn Client>, DbError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DbError::Connection("connection refused".into()));
        }
        let client = Arc::new(MockClient::default());
        self.clients.lock().unwrap().push(Arc::clone(&client));
        Ok(client)
    }
}

pub struct MockClient {
    pub alive: AtomicBool,
    pub closed: AtomicBool,
    databases: Mutex<HashMap<String, Arc<MockDb>>>,
}

impl Default for MockClient {
    fn default() -> Self {
        Self {
            alive: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            databases: Mutex::new(HashMap::new()),
        }
    }
}

impl MockClient {
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Client for MockClient {
    async fn ping(&self) -> Result<(), DbError> {
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DbError::Connection("ping timed out".into()))
        }
    }

    fn database(&self, name: &str) -> Result<Arc<dyn DocumentDb>, DbError> {
        let mut databases = self.databases.lock().unwrap();
        let db = databases
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MockDb::new(name)));
        Ok(Arc::clone(db) as Arc<dyn DocumentDb>)
    }

    async fn close(&self) -> Result<(), DbError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockDb {
    name: String,
    collections: Mutex<HashMap<String, Arc<MockCollection>>>,
}

impl MockDb {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: Mutex::new(HashMap::new()),
        }
    }
}

impl DocumentDb for MockDb {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> Arc<dyn Collection> {
        let mut collections = self.collections.lock().unwrap();
        let collection = collections.entry(name.to_string()).or_default();
        Arc::clone(collection) as Arc<dyn Collection>
    }
}

#[derive(Default)]
pub struct MockCollection {
    documents: Mutex<Vec<Document>>,
}

#[async_trait]
impl Collection for MockCollection {
    async fn find(&self, filter: &Document) -> Result<Vec<Document>, DbError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .cloned()
            .collect())
    }

    async fn insert_one(&self, mut document: Document) -> Result<Document, DbError> {
        document
            .entry("_id")
            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
        self.documents.lock().unwrap().push(document.clone());
        Ok(document)
    }

    async fn delete_one(&self, filter: &Document) -> Result<bool, DbError> {
        let mut documents = self.documents.lock().unwrap();
        match documents.iter().position(|doc| matches_filter(doc, filter)) {
            Some(index) => {
                documents.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ============================================================================
// State and requests
// ============================================================================

pub fn test_config(temp_dir: &tempfile::TempDir, environment: Environment) -> Config {
    let data_dir = temp_dir.path().join("data").to_string_lossy().to_string();
    Config {
        app: AppConfig {
            environment,
            ..Default::default()
        },
        database: DatabaseConfig {
            url: Some(data_dir.clone()),
            data_dir,
            ..Default::default()
        },
        uploads: UploadConfig {
            max_file_size: 64 * 1024,
            max_files: 3,
            ..Default::default()
        },
    }
}

/// Production-mode state (guarded initialization) backed by `connector`.
pub fn state_with(temp_dir: &tempfile::TempDir, connector: Arc<dyn Connector>) -> Arc<AppState> {
    let config = test_config(temp_dir, Environment::Production);
    Arc::new(AppState::new(config, connector, PathResolver::new(temp_dir.path())))
}

/// Production-mode state backed by the embedded redb driver.
pub fn redb_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let config = test_config(temp_dir, Environment::Production);
    let connector = Arc::new(RedbConnector::new(&config.database.data_dir));
    Arc::new(AppState::new(config, connector, PathResolver::new(temp_dir.path())))
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ============================================================================
// Multipart
// ============================================================================

pub const BOUNDARY: &str = "ovenly-test-boundary";

pub struct Part<'a> {
    pub field: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(field: &'a str, filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            field,
            filename: Some(filename),
            content_type,
            data,
        }
    }
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{filename}\"\r\nContent-Type: {}\r\n\r\n",
                    part.field, part.content_type
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.field).as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

/// File names currently stored directly under the uploads root.
pub fn stored_files(temp_dir: &tempfile::TempDir) -> Vec<String> {
    let root = temp_dir.path().join("uploads");
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
