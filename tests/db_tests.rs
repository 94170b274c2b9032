mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::json;

use common::MockConnector;
use ovenly_api::config::DatabaseConfig;
use ovenly_api::db::{Database, DbConnection, DbError, DocumentDb};

fn connection(connector: &Arc<MockConnector>, development: bool) -> DbConnection {
    DbConnection::new(
        connector.clone(),
        DatabaseConfig {
            url: Some("mock://cluster/ovenly".to_string()),
            ..Default::default()
        },
        development,
    )
}

#[tokio::test]
async fn test_live_connection_is_reused() {
    let connector = Arc::new(MockConnector::default());
    let db = connection(&connector, false);

    let first = db.connect().await.unwrap();
    let second = db.connect().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(connector.connect_count(), 1);
    assert_eq!(first.name(), Some("ovenly"));
}

#[tokio::test]
async fn test_dead_connection_is_replaced() {
    let connector = Arc::new(MockConnector::default());
    let db = connection(&connector, false);

    let first = db.connect().await.unwrap();
    let old_client = connector.latest_client();
    old_client.kill();

    let second = db.connect().await.unwrap();

    assert_eq!(connector.connect_count(), 2);
    assert!(old_client.closed.load(Ordering::SeqCst));
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(db.is_connected().await);
}

#[tokio::test]
async fn test_collection_requires_connection() {
    let connector = Arc::new(MockConnector::default());
    let db = connection(&connector, true);

    assert!(matches!(db.collection("users").await, Err(DbError::NotConnected)));
    assert!(!db.is_connected().await);

    db.connect().await.unwrap();
    let users = db.collection("users").await.unwrap();
    let stored = users
        .insert_one(json!({"email": "ada@example.com"}).as_object().unwrap().clone())
        .await
        .unwrap();
    assert!(stored.contains_key("_id"));
}

#[tokio::test]
async fn test_disconnect_twice_is_harmless() {
    let connector = Arc::new(MockConnector::default());
    let db = connection(&connector, false);
    db.connect().await.unwrap();
    let client = connector.latest_client();

    db.disconnect().await.unwrap();
    db.disconnect().await.unwrap();

    assert!(client.closed.load(Ordering::SeqCst));
    assert!(!db.is_connected().await);
    assert!(matches!(db.database().await, Err(DbError::NotConnected)));
}

#[tokio::test]
async fn test_failed_connect_leaves_nothing_bound() {
    let connector = Arc::new(MockConnector::failing());
    let db = connection(&connector, false);

    let err = db.connect().await.err().unwrap();
    assert!(matches!(err, DbError::Connection(_)));
    assert!(!db.is_connected().await);
}

#[tokio::test]
async fn test_missing_target_is_a_config_error() {
    let connector = Arc::new(MockConnector::default());
    let db = DbConnection::new(
        connector.clone(),
        DatabaseConfig {
            url: None,
            host: String::new(),
            ..Default::default()
        },
        false,
    );

    let err = db.connect().await.err().unwrap();
    assert!(err.to_string().contains("DATABASE_URL"));
    assert_eq!(connector.connect_count(), 0);
}

#[test]
fn test_database_binds_once() {
    struct Named(&'static str);

    impl DocumentDb for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn collection(&self, _name: &str) -> Arc<dyn ovenly_api::db::Collection> {
            unreachable!("not used")
        }
    }

    let database = Database::new();
    assert!(matches!(database.collection("users"), Err(DbError::NotBound)));

    database.set_database(Arc::new(Named("first"))).unwrap();
    assert!(matches!(
        database.set_database(Arc::new(Named("second"))),
        Err(DbError::AlreadyBound)
    ));
    assert_eq!(database.name(), Some("first"));
}
