//! Shared test helpers for in-crate unit tests.

use std::sync::Arc;

use crate::config::{AppConfig, Config, DatabaseConfig, UploadConfig};
use crate::paths::PathResolver;
use crate::storage::RedbConnector;
use crate::AppState;

pub fn test_config(temp_dir: &tempfile::TempDir) -> Config {
    Config {
        app: AppConfig::default(),
        database: DatabaseConfig {
            url: Some(temp_dir.path().join("data").to_string_lossy().to_string()),
            data_dir: temp_dir.path().join("data").to_string_lossy().to_string(),
            ..Default::default()
        },
        uploads: UploadConfig {
            max_file_size: 1024 * 1024, // 1MB for tests
            ..Default::default()
        },
    }
}

/// Create a test AppState rooted in a temporary directory with the embedded driver.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let config = test_config(temp_dir);
    let connector = Arc::new(RedbConnector::new(&config.database.data_dir));
    let paths = PathResolver::new(temp_dir.path());
    Arc::new(AppState::new(config, connector, paths))
}
