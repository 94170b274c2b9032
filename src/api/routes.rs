use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::InitMode;
use crate::init::require_initialized;
use crate::routing::FORM_BODY_LIMIT;
use crate::AppState;

/// Multipart framing allowance on top of the file bytes themselves.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let uploads = &state.config.uploads;
    let body_limit = (uploads.max_file_size as usize)
        .saturating_mul(uploads.max_files)
        .saturating_add(MULTIPART_OVERHEAD)
        .max(FORM_BODY_LIMIT);

    let mut router = Router::new()
        // Stored uploads
        .route("/uploads/*filename", get(handlers::serve_upload))
        // Everything else goes through the runtime route table
        .fallback(handlers::dispatch)
        .layer(DefaultBodyLimit::max(body_limit));

    if state.config.init_mode() == InitMode::Guarded {
        router = router.layer(middleware::from_fn_with_state(
            Arc::clone(&state.init),
            require_initialized,
        ));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
