//! ovenly-api - REST backend for the Ovenly finance app
//!
//! This crate provides:
//! - Feature modules whose routes are discovered at build time and bound at runtime
//! - Guarded, single-flight initialization (database connect, route discovery, binding)
//! - Multipart uploads stored under content-addressed names
//! - A document database connection manager with an embedded redb driver

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod hash;
pub mod init;
pub mod modules;
pub mod paths;
pub mod routing;
pub mod storage;
pub mod uploads;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use db::{Connector, DbConnection};
use init::InitGuard;
use paths::PathResolver;
use routing::{DynamicRouter, RouteDiscovery, RouteModule, RouteRegistry};

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: DbConnection,
    pub paths: PathResolver,
    pub registry: RouteRegistry,
    pub router: Arc<DynamicRouter>,
    pub discovery: RouteDiscovery,
    pub init: Arc<InitGuard>,
    /// Route modules imported during initialization
    pub manifest: &'static [RouteModule],
}

impl AppState {
    pub fn new(config: Config, connector: Arc<dyn Connector>, paths: PathResolver) -> Self {
        let db = DbConnection::new(connector, config.database.clone(), config.is_development());
        let registry = RouteRegistry::new(&config.app.api_prefix);
        Self {
            config,
            db,
            paths,
            registry,
            router: Arc::new(DynamicRouter::new()),
            discovery: RouteDiscovery::new(),
            init: Arc::new(InitGuard::new()),
            manifest: modules::ROUTE_MODULES,
        }
    }

    /// Replace the build-time route manifest.
    pub fn with_manifest(mut self, manifest: &'static [RouteModule]) -> Self {
        self.manifest = manifest;
        self
    }
}
