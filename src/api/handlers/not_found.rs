use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};

use crate::api::response::ApiError;

/// Paths browsers and crawlers request on their own; missing them is not worth a warning.
const IGNORED_404_PATHS: &[&str] = &["/.well-known/", "/favicon.ico", "/robots.txt", "/sitemap.xml"];

pub fn route_not_found(method: &Method, uri: &Uri) -> Response {
    let path = uri.path();
    if !IGNORED_404_PATHS.iter().any(|ignored| path.starts_with(ignored)) {
        tracing::warn!(%method, %uri, "Route not found");
    }
    ApiError::not_found(format!("Route {method} {uri} not found")).into_response()
}

pub async fn not_found(method: Method, uri: Uri) -> Response {
    route_not_found(&method, &uri)
}
