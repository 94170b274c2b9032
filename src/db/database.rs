use std::sync::{Arc, OnceLock};

use super::{Collection, DbError, DocumentDb};

/// Handle to one bound database. The database can be set once; a reconnect
/// produces a fresh handle.
#[derive(Default)]
pub struct Database {
    inner: OnceLock<Arc<dyn DocumentDb>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_database(&self, database: Arc<dyn DocumentDb>) -> Result<(), DbError> {
        self.inner.set(database).map_err(|_| DbError::AlreadyBound)
    }

    pub fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, DbError> {
        self.inner
            .get()
            .map(|db| db.collection(name))
            .ok_or(DbError::NotBound)
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.get().map(|db| db.name())
    }
}
