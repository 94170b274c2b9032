use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::builder::RouteBuilder;
use super::handler::{Handler, RouteMethod};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Invalid route path \"{0}\": paths must start with '/'")]
    InvalidPath(String),
    #[error("Route {method} {path} has no handlers")]
    NoHandlers { method: RouteMethod, path: String },
    #[error("Route {method} {path} is already bound")]
    Duplicate { method: RouteMethod, path: String },
    #[error("Route {method} {path} cannot be bound: {reason}")]
    Conflict {
        method: RouteMethod,
        path: String,
        reason: String,
    },
    #[error("Failed to import routes from {module}: {reason}")]
    Module { module: String, reason: String },
}

/// The application a registry binds its routes to.
pub trait Application: Send + Sync {
    fn bind(&self, method: RouteMethod, path: &str, handlers: Vec<Handler>) -> Result<(), RouteError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: RouteMethod,
    /// Path relative to the prefix
    pub path: String,
    pub registered: bool,
}

struct Route {
    method: RouteMethod,
    path: String,
    handlers: Vec<Handler>,
    registered: bool,
}

#[derive(Default)]
struct RegistryInner {
    routes: Vec<Route>,
    app: Option<Arc<dyn Application>>,
}

/// Collects route declarations and binds each one to the application exactly
/// once, whether it was declared before or after the application was attached.
pub struct RouteRegistry {
    prefix: String,
    inner: Mutex<RegistryInner>,
}

impl RouteRegistry {
    /// `api_prefix` is applied to every bound path, e.g. "api" gives "/api/users".
    pub fn new(api_prefix: &str) -> Self {
        let trimmed = api_prefix.trim_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        Self {
            prefix,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Declare a route. Routes without handlers are rejected and never stored.
    pub fn add_route(&self, method: RouteMethod, path: &str, handlers: Vec<Handler>) -> &Self {
        if handlers.is_empty() {
            error!(%method, path, "Route must have at least one handler");
            return self;
        }

        let mut inner = self.lock();
        let mut route = Route {
            method,
            path: path.to_string(),
            handlers,
            registered: false,
        };
        if inner.app.is_some() {
            register_route(&self.prefix, inner.app.as_ref(), &mut route);
        }
        inner.routes.push(route);
        self
    }

    pub fn get(&self, path: &str, handlers: Vec<Handler>) -> &Self {
        self.add_route(RouteMethod::Get, path, handlers)
    }

    pub fn post(&self, path: &str, handlers: Vec<Handler>) -> &Self {
        self.add_route(RouteMethod::Post, path, handlers)
    }

    pub fn put(&self, path: &str, handlers: Vec<Handler>) -> &Self {
        self.add_route(RouteMethod::Put, path, handlers)
    }

    pub fn patch(&self, path: &str, handlers: Vec<Handler>) -> &Self {
        self.add_route(RouteMethod::Patch, path, handlers)
    }

    pub fn delete(&self, path: &str, handlers: Vec<Handler>) -> &Self {
        self.add_route(RouteMethod::Delete, path, handlers)
    }

    /// Group several methods under one base path.
    pub fn route(&self, base: &str) -> RouteBuilder<'_> {
        RouteBuilder::new(base, self)
    }

    /// Attach the application and bind every route not yet bound.
    pub fn scan(&self, app: Arc<dyn Application>) {
        let mut inner = self.lock();
        inner.app = Some(app);

        let RegistryInner { routes, app } = &mut *inner;
        for route in routes.iter_mut().filter(|route| !route.registered) {
            register_route(&self.prefix, app.as_ref(), route);
        }
    }

    pub fn routes(&self) -> Vec<RouteInfo> {
        self.lock()
            .routes
            .iter()
            .map(|route| RouteInfo {
                method: route.method,
                path: route.path.clone(),
                registered: route.registered,
            })
            .collect()
    }

    pub fn registered_count(&self) -> usize {
        self.lock().routes.iter().filter(|r| r.registered).count()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn register_route(prefix: &str, app: Option<&Arc<dyn Application>>, route: &mut Route) {
    let Some(app) = app else {
        debug!(method = %route.method, path = %route.path, "Application not attached yet, deferring route");
        return;
    };

    let mut full_path = format!("{prefix}{}", route.path);
    if full_path.is_empty() {
        full_path.push('/');
    }

    let handlers = with_completion_log(route.method, &full_path, &route.handlers);
    match app.bind(route.method, &full_path, handlers) {
        Ok(()) => {
            route.registered = true;
            debug!(method = %route.method, path = %full_path, "Route registered");
        }
        Err(e) => error!(method = %route.method, path = %full_path, error = %e, "Failed to register route"),
    }
}

/// Wrap the final handler so the route logs its outcome once it answers.
fn with_completion_log(method: RouteMethod, path: &str, handlers: &[Handler]) -> Vec<Handler> {
    let Some((terminal, middleware)) = handlers.split_last() else {
        return Vec::new();
    };

    let terminal = terminal.clone();
    let path = path.to_string();
    let mut chain = middleware.to_vec();
    chain.push(Handler::middleware(move |http, next| {
        let terminal = terminal.clone();
        let path = path.clone();
        async move {
            let started = Instant::now();
            let response = terminal.call(http, next).await;
            log_route_completion(method, &path, response.status(), started.elapsed());
            response
        }
    }));
    chain
}

pub fn log_route_completion(method: RouteMethod, path: &str, status: StatusCode, duration: Duration) {
    let status_code = status.as_u16();
    let duration_ms = duration.as_millis() as u64;
    if status.is_server_error() {
        error!(%method, path, status = status_code, duration_ms, "Route completed");
    } else if status.is_client_error() {
        warn!(%method, path, status = status_code, duration_ms, "Route completed");
    } else {
        info!(%method, path, status = status_code, duration_ms, "Route completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(RouteRegistry::new("api").prefix(), "/api");
        assert_eq!(RouteRegistry::new("/v1/").prefix(), "/v1");
        assert_eq!(RouteRegistry::new("").prefix(), "");
    }

    #[test]
    fn test_routes_without_app_stay_pending() {
        let registry = RouteRegistry::new("api");
        registry.get("/health", vec![Handler::endpoint(|_| async { "ok" })]);

        let routes = registry.routes();
        assert_eq!(routes.len(), 1);
        assert!(!routes[0].registered);
        assert_eq!(registry.registered_count(), 0);
    }
}
