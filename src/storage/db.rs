use redb::{Database as RedbDatabase, ReadTransaction, WriteTransaction};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use async_trait::async_trait;

use crate::db::{Client, ConnectOptions, ConnectionTarget, Connector, DbError, DocumentDb};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for DatabaseError {
    fn from(e: redb::CommitError) -> Self {
        DatabaseError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for DatabaseError {
    fn from(e: redb::DatabaseError) -> Self {
        DatabaseError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::Error> for DatabaseError {
    fn from(e: redb::Error) -> Self {
        DatabaseError::Redb(Box::new(e))
    }
}

impl From<redb::StorageError> for DatabaseError {
    fn from(e: redb::StorageError) -> Self {
        DatabaseError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for DatabaseError {
    fn from(e: redb::TableError) -> Self {
        DatabaseError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for DatabaseError {
    fn from(e: redb::TransactionError) -> Self {
        DatabaseError::Transaction(Box::new(e))
    }
}

/// Opens embedded document stores. A connection target names a directory that
/// holds one `<name>.redb` file per database.
pub struct RedbConnector {
    data_dir: PathBuf,
}

impl RedbConnector {
    /// `data_dir` anchors `host:port` targets, which map to `<data_dir>/<host>-<port>`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn directory_for(&self, target: &ConnectionTarget) -> Result<PathBuf, DbError> {
        match target {
            ConnectionTarget::Url(url) => {
                let path = match url.split_once("://") {
                    Some(("redb" | "file", rest)) => rest,
                    Some(_) => return Err(DbError::UnsupportedTarget(target.sanitized())),
                    None => url.as_str(),
                };
                if path.is_empty() {
                    return Err(DbError::UnsupportedTarget(target.sanitized()));
                }
                Ok(PathBuf::from(path))
            }
            ConnectionTarget::HostPort { host, port } => {
                Ok(self.data_dir.join(format!("{host}-{port}")))
            }
        }
    }
}

#[async_trait]
impl Connector for RedbConnector {
    async fn connect(
        &self,
        target: &ConnectionTarget,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn Client>, DbError> {
        let dir = self.directory_for(target)?;
        if options.credentials.is_some() {
            tracing::debug!("Embedded store ignores connection credentials");
        }

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DbError::Connection(format!("{}: {e}", dir.display())))?;

        Ok(Arc::new(RedbClient::new(dir)))
    }
}

/// A connection to a directory of database files.
pub struct RedbClient {
    dir: PathBuf,
    databases: Mutex<HashMap<String, Arc<RedbDocumentDb>>>,
    closed: AtomicBool,
}

impl RedbClient {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            databases: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn open_databases(&self) -> Vec<Arc<RedbDocumentDb>> {
        self.databases
            .lock()
            .map(|dbs| dbs.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Client for RedbClient {
    async fn ping(&self) -> Result<(), DbError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::Connection("client is closed".to_string()));
        }
        if !tokio::fs::try_exists(&self.dir).await.unwrap_or(false) {
            return Err(DbError::Connection(format!(
                "{} is no longer available",
                self.dir.display()
            )));
        }
        for db in self.open_databases() {
            db.begin_read()?;
        }
        Ok(())
    }

    fn database(&self, name: &str) -> Result<Arc<dyn DocumentDb>, DbError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::NotConnected);
        }
        if name.is_empty() || name.contains(|c: char| c == '/' || c == '\\') || name.starts_with('.') {
            return Err(DbError::InvalidName(name.to_string()));
        }

        let mut databases = self
            .databases
            .lock()
            .map_err(|_| DbError::Connection("database cache poisoned".to_string()))?;
        if let Some(db) = databases.get(name) {
            return Ok(Arc::clone(db) as Arc<dyn DocumentDb>);
        }

        let db = Arc::new(RedbDocumentDb::open(
            self.dir.join(format!("{name}.redb")),
            name,
        )?);
        databases.insert(name.to_string(), Arc::clone(&db));
        Ok(db as Arc<dyn DocumentDb>)
    }

    async fn close(&self) -> Result<(), DbError> {
        self.closed.store(true, Ordering::Release);
        if let Ok(mut databases) = self.databases.lock() {
            databases.clear();
        }
        Ok(())
    }
}

/// One database file.
pub struct RedbDocumentDb {
    pub(super) db: Arc<RedbDatabase>,
    pub(super) name: String,
}

impl RedbDocumentDb {
    /// Open or create a database file at the given path
    pub fn open<P: AsRef<Path>>(path: P, name: &str) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Arc::new(RedbDatabase::create(path.as_ref())?);
        Ok(Self {
            db,
            name: name.to_string(),
        })
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }
}
