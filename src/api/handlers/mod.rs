mod not_found;
mod static_files;

use axum::extract::{Request, State};
use axum::response::Response;
use std::sync::Arc;

use crate::AppState;

pub use not_found::{not_found, route_not_found};
pub use static_files::serve_upload;

/// Hand a request to the routes registered at runtime.
pub async fn dispatch(State(state): State<Arc<AppState>>, mut req: Request) -> Response {
    req.extensions_mut().insert(Arc::clone(&state));
    state.router.dispatch(req).await
}
