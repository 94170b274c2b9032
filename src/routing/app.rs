use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::on;
use axum::Router;
use tower::ServiceExt;

use super::context::Http;
use super::handler::{Handler, Next, RouteMethod};
use super::registry::{Application, RouteError};
use crate::api::handlers::not_found;
use crate::api::response::ApiError;
use crate::AppState;

/// An axum router that accepts routes after the server has started.
///
/// Bindings rebuild the inner router under a write lock; each request runs
/// against a snapshot taken at dispatch time.
pub struct DynamicRouter {
    router: RwLock<Router>,
    bound: Mutex<HashSet<(RouteMethod, String)>>,
}

impl Default for DynamicRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicRouter {
    pub fn new() -> Self {
        Self {
            router: RwLock::new(Router::new().fallback(not_found)),
            bound: Mutex::new(HashSet::new()),
        }
    }

    pub fn snapshot(&self) -> Router {
        self.router
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_bound(&self, method: RouteMethod, path: &str) -> bool {
        self.bound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(method, path.to_string()))
    }

    /// Route one request. The application state must already be in the request extensions.
    pub async fn dispatch(&self, req: Request) -> Response {
        match self.snapshot().oneshot(req).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

impl Application for DynamicRouter {
    fn bind(&self, method: RouteMethod, path: &str, handlers: Vec<Handler>) -> Result<(), RouteError> {
        if !path.starts_with('/') {
            return Err(RouteError::InvalidPath(path.to_string()));
        }
        if handlers.is_empty() {
            return Err(RouteError::NoHandlers {
                method,
                path: path.to_string(),
            });
        }

        let key = (method, path.to_string());
        let mut bound = self.bound.lock().unwrap_or_else(PoisonError::into_inner);
        if bound.contains(&key) {
            return Err(RouteError::Duplicate {
                method,
                path: path.to_string(),
            });
        }

        let chain: Arc<[Handler]> = handlers.into();
        let method_router = on(method.filter(), move |req: Request| {
            let chain = Arc::clone(&chain);
            async move { run_chain(chain, req).await }
        });

        // axum panics on malformed or conflicting paths; the live router is
        // only replaced once the new one has been built.
        let mut router = self.router.write().unwrap_or_else(PoisonError::into_inner);
        let candidate = router.clone();
        let updated = panic::catch_unwind(AssertUnwindSafe(|| candidate.route(path, method_router)))
            .map_err(|payload| RouteError::Conflict {
                method,
                path: path.to_string(),
                reason: panic_message(payload.as_ref()),
            })?;

        *router = updated;
        bound.insert(key);
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "route rejected by router".to_string())
}

async fn run_chain(chain: Arc<[Handler]>, req: Request) -> Response {
    let Some(state) = req.extensions().get::<Arc<AppState>>().cloned() else {
        return ApiError::internal("Application state is not available").into_response();
    };

    match Http::from_request(req, state).await {
        Ok(http) => Next::new(chain).run(http).await,
        Err(e) => e.into_response(),
    }
}
