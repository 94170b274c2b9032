use std::sync::Arc;

use tracing::info;

use crate::init::InitError;
use crate::routing::Application;
use crate::AppState;

/// Connect the database, then import and bind every route module.
pub async fn initialize(state: Arc<AppState>) -> Result<(), InitError> {
    state.db.connect().await?;
    setup_routes(&state).await
}

/// Import route modules and bind all declared routes to the runtime router.
pub async fn setup_routes(state: &AppState) -> Result<(), InitError> {
    state
        .discovery
        .discover_and_import_routes(&state.registry, state.manifest)
        .await?;

    let app: Arc<dyn Application> = state.router.clone();
    state.registry.scan(app);

    info!(
        routes = state.registry.registered_count(),
        prefix = state.registry.prefix(),
        "Routes registered"
    );
    Ok(())
}
