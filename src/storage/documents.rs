use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database as RedbDatabase, ReadableTable, TableError};
use serde_json::Value;

use super::db::{DatabaseError, RedbDocumentDb};
use super::tables::collection_table;
use crate::db::{matches_filter, Collection, DbError, Document, DocumentDb};

impl DocumentDb for RedbDocumentDb {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> Arc<dyn Collection> {
        Arc::new(RedbCollection {
            db: Arc::clone(&self.db),
            name: name.to_string(),
        })
    }
}

pub struct RedbCollection {
    db: Arc<RedbDatabase>,
    name: String,
}

impl RedbCollection {
    // ========================================================================
    // Document operations
    // ========================================================================

    fn find_documents(&self, filter: &Document) -> Result<Vec<Document>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(collection_table(&self.name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut documents = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let document: Document = rmp_serde::from_slice(value.value())?;
            if matches_filter(&document, filter) {
                documents.push(document);
            }
        }

        Ok(documents)
    }

    /// Store a document under its `_id`, generating one when absent
    fn insert_document(&self, mut document: Document) -> Result<Document, DatabaseError> {
        let id = match document.get("_id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => uuid::Uuid::new_v4().to_string(),
        };
        document.insert("_id".to_string(), Value::String(id.clone()));

        let data = rmp_serde::to_vec_named(&document)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(collection_table(&self.name))?;
            table.insert(id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;

        Ok(document)
    }

    /// Delete the first document matching `filter`
    fn delete_document(&self, filter: &Document) -> Result<bool, DatabaseError> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(collection_table(&self.name))?;

            let mut found: Option<String> = None;
            for result in table.iter()? {
                let (key, value) = result?;
                let document: Document = rmp_serde::from_slice(value.value())?;
                if matches_filter(&document, filter) {
                    found = Some(key.value().to_string());
                    break;
                }
            }

            match found {
                Some(key) => {
                    table.remove(key.as_str())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;

        Ok(deleted)
    }
}

#[async_trait]
impl Collection for RedbCollection {
    async fn find(&self, filter: &Document) -> Result<Vec<Document>, DbError> {
        Ok(self.find_documents(filter)?)
    }

    async fn insert_one(&self, document: Document) -> Result<Document, DbError> {
        Ok(self.insert_document(document)?)
    }

    async fn delete_one(&self, filter: &Document) -> Result<bool, DbError> {
        Ok(self.delete_document(filter)?)
    }
}
