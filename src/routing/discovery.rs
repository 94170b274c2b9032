use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use futures::future::try_join_all;
use tracing::{error, info, warn};

use super::registry::{RouteError, RouteRegistry};

pub type RegisterFn = fn(&RouteRegistry) -> Result<(), RouteError>;

/// A feature module's route declarations, found at build time.
#[derive(Debug, Clone, Copy)]
pub struct RouteModule {
    /// Module path below the modules directory, e.g. "file_uploads"
    pub name: &'static str,
    /// Source file the entry was generated from
    pub source: &'static str,
    pub register: RegisterFn,
}

/// Runs every module's route declarations once.
#[derive(Default)]
pub struct RouteDiscovery {
    imported: Mutex<HashSet<&'static str>>,
}

impl RouteDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import every module in `manifest` that has not been imported yet and
    /// return how many were imported by this call. The first module that
    /// fails aborts discovery with its error.
    pub async fn discover_and_import_routes(
        &self,
        registry: &RouteRegistry,
        manifest: &[RouteModule],
    ) -> Result<usize, RouteError> {
        if manifest.is_empty() {
            warn!("No route files found in modules directory");
            return Ok(0);
        }
        info!(count = manifest.len(), "Found route file(s)");

        let pending: Vec<&RouteModule> = {
            let mut imported = self.imported.lock().unwrap_or_else(PoisonError::into_inner);
            manifest
                .iter()
                .filter(|module| imported.insert(module.source))
                .collect()
        };

        let imports = pending.iter().map(|module| async move {
            match (module.register)(registry) {
                Ok(()) => {
                    info!(module = module.name, "Imported routes");
                    Ok(())
                }
                Err(e) => {
                    error!(module = module.name, source = module.source, error = %e, "Failed to import routes");
                    self.forget(module.source);
                    Err(RouteError::Module {
                        module: module.name.to_string(),
                        reason: e.to_string(),
                    })
                }
            }
        });
        try_join_all(imports).await?;

        info!(count = pending.len(), "Successfully imported route file(s)");
        Ok(pending.len())
    }

    pub fn is_imported(&self, source: &str) -> bool {
        self.imported
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(source)
    }

    fn forget(&self, source: &str) {
        self.imported
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(source);
    }
}
