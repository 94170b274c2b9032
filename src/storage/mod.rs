//! Embedded document store on redb, behind the `crate::db` driver traits.

pub mod db;
mod documents;
mod tables;

pub use db::{DatabaseError, RedbClient, RedbConnector, RedbDocumentDb};
pub use documents::RedbCollection;
pub use tables::collection_table;
