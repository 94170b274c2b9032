use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::routing::MethodFilter;
use futures::future::BoxFuture;

use super::context::Http;
use crate::api::handlers::route_not_found;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RouteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Patch => "PATCH",
            RouteMethod::Delete => "DELETE",
        }
    }

    pub fn filter(&self) -> MethodFilter {
        match self {
            RouteMethod::Get => MethodFilter::GET,
            RouteMethod::Post => MethodFilter::POST,
            RouteMethod::Put => MethodFilter::PUT,
            RouteMethod::Patch => MethodFilter::PATCH,
            RouteMethod::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RouteMethod> for Method {
    fn from(method: RouteMethod) -> Self {
        match method {
            RouteMethod::Get => Method::GET,
            RouteMethod::Post => Method::POST,
            RouteMethod::Put => Method::PUT,
            RouteMethod::Patch => Method::PATCH,
            RouteMethod::Delete => Method::DELETE,
        }
    }
}

type HandlerFn = dyn Fn(Http, Next) -> BoxFuture<'static, Response> + Send + Sync;

/// One step of a route's handler chain.
///
/// Middleware receives the request context and the rest of the chain; it may
/// answer directly or hand the (possibly modified) context to [`Next::run`].
/// Endpoints ignore the rest of the chain.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerFn>,
}

impl Handler {
    pub fn middleware<F, Fut>(f: F) -> Self
    where
        F: Fn(Http, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |http: Http, next: Next| -> BoxFuture<'static, Response> {
                Box::pin(f(http, next))
            }),
        }
    }

    pub fn endpoint<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Http) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        Self::middleware(move |http, _next| {
            let fut = f(http);
            async move { fut.await.into_response() }
        })
    }

    pub fn call(&self, http: Http, next: Next) -> BoxFuture<'static, Response> {
        (self.inner)(http, next)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}

/// The remainder of a handler chain.
pub struct Next {
    chain: Arc<[Handler]>,
    position: usize,
}

impl Next {
    pub fn new(chain: Arc<[Handler]>) -> Self {
        Self { chain, position: 0 }
    }

    /// Run the next handler; an exhausted chain answers 404.
    pub async fn run(self, http: Http) -> Response {
        match self.chain.get(self.position).cloned() {
            Some(handler) => {
                let next = Next {
                    chain: self.chain,
                    position: self.position + 1,
                };
                handler.call(http, next).await
            }
            None => route_not_found(http.method(), http.uri()),
        }
    }
}
