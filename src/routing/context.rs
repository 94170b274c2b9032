use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequestParts, RawPathParams, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Uri};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::api::response::{friendly_query_error, ApiError};
use crate::uploads::UploadedFile;
use crate::AppState;

/// Largest JSON or urlencoded body read into the context.
pub const FORM_BODY_LIMIT: usize = 1024 * 1024;

/// Everything a handler chain knows about one request.
///
/// Built once per request before the chain runs, so concurrent requests never
/// observe each other's data. Middleware may add body fields or uploaded files
/// before handing the context on.
pub struct Http {
    parts: Parts,
    body: Option<Body>,
    params: Map<String, Value>,
    query: Map<String, Value>,
    fields: Map<String, Value>,
    files: Vec<UploadedFile>,
    state: Arc<AppState>,
}

impl Http {
    /// Parse path parameters, query string and (for JSON and urlencoded
    /// requests) the body. Multipart bodies are left for upload middleware.
    pub async fn from_request(req: Request, state: Arc<AppState>) -> Result<Self, ApiError> {
        let (mut parts, body) = req.into_parts();

        let params = match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(raw) => raw
                .iter()
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect(),
            Err(_) => Map::new(),
        };

        let query = match parts.uri.query() {
            Some(query) if !query.is_empty() => serde_qs::from_str::<Map<String, Value>>(query)
                .map_err(|e| ApiError::bad_request(friendly_query_error(&e.to_string())))?,
            _ => Map::new(),
        };

        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let (fields, body) = if content_type.starts_with("application/json") {
            (read_json_body(body).await?, None)
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            (read_form_body(body).await?, None)
        } else {
            (Map::new(), Some(body))
        };

        Ok(Self {
            parts,
            body,
            params,
            query,
            fields,
            files: Vec::new(),
            state,
        })
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Public base URL of this request, `scheme://host`.
    pub fn base_url(&self) -> String {
        let scheme = self
            .header("x-forwarded-proto")
            .or_else(|| self.parts.uri.scheme_str())
            .unwrap_or("http");
        let host = self
            .header("x-forwarded-host")
            .or_else(|| self.header("host"))
            .unwrap_or(self.state.config.app.host.as_str());
        format!("{scheme}://{host}")
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    /// Body, path parameters and query merged; later sources win on collisions.
    pub fn all_data(&self) -> Map<String, Value> {
        let mut data = self.fields.clone();
        data.extend(self.params.clone());
        data.extend(self.query.clone());
        data
    }

    /// First non-null value for `key` from the body, then path parameters, then query.
    pub fn input(&self, key: &str) -> Option<&Value> {
        [&self.fields, &self.params, &self.query]
            .into_iter()
            .filter_map(|source| source.get(key))
            .find(|value| !value.is_null())
    }

    pub fn input_or(&self, key: &str, fallback: Value) -> Value {
        self.input(key).cloned().unwrap_or(fallback)
    }

    pub fn string(&self, key: &str) -> Option<String> {
        match self.input(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Numeric input. Absent keys yield `fallback`; values that are not numbers yield `None`.
    pub fn number(&self, key: &str, fallback: f64) -> Option<f64> {
        match self.input(key) {
            None => Some(fallback),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            Some(_) => None,
        }
    }

    pub fn boolean(&self, key: &str, fallback: bool) -> bool {
        match self.input(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true") || s == "1",
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => fallback,
        }
    }

    /// Deserialize the merged request data into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.all_data()))
    }

    /// Deserialize only the body fields into `T`.
    pub fn parse_body<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn extend_fields(&mut self, fields: Map<String, Value>) {
        self.fields.extend(fields);
    }

    /// Uploaded files, optionally only those sent under `field`.
    pub fn files(&self, field: Option<&str>) -> Vec<&UploadedFile> {
        self.files
            .iter()
            .filter(|file| field.map_or(true, |name| file.field_name == name))
            .collect()
    }

    pub fn set_files(&mut self, files: Vec<UploadedFile>) {
        self.files = files;
    }

    /// Hand the unread body back as a request, for extractors such as multipart.
    /// Returns `None` once the body has been taken or was already parsed.
    pub fn take_request(&mut self) -> Option<Request> {
        let body = self.body.take()?;
        let mut req = Request::new(body);
        *req.method_mut() = self.parts.method.clone();
        *req.uri_mut() = self.parts.uri.clone();
        *req.headers_mut() = self.parts.headers.clone();
        *req.extensions_mut() = self.parts.extensions.clone();
        Some(req)
    }
}

async fn read_bytes(body: Body) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, FORM_BODY_LIMIT)
        .await
        .map_err(|_| ApiError::payload_too_large("Request body is too large"))
}

async fn read_json_body(body: Body) -> Result<Map<String, Value>, ApiError> {
    let bytes = read_bytes(body).await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
        Err(e) => Err(ApiError::bad_request(format!("Malformed JSON in request body: {e}"))),
    }
}

async fn read_form_body(body: Body) -> Result<Map<String, Value>, ApiError> {
    let bytes = read_bytes(body).await?;
    if bytes.is_empty() {
        return Ok(Map::new());
    }
    serde_qs::from_bytes::<Map<String, Value>>(&bytes)
        .map_err(|e| ApiError::bad_request(format!("Malformed form body: {e}")))
}
