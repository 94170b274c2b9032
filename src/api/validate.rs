use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::response::JSend;
use crate::routing::{Handler, Http, Next};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

/// 400 with one entry per invalid field.
pub fn validation_failed(errors: Vec<FieldError>) -> Response {
    (StatusCode::BAD_REQUEST, JSend::fail(ValidationErrors { errors })).into_response()
}

/// Middleware rejecting requests whose merged input does not deserialize into `T`.
pub fn validate_body<T>() -> Handler
where
    T: DeserializeOwned + Send + 'static,
{
    Handler::middleware(|http: Http, next: Next| async move {
        match http.parse::<T>() {
            Ok(_) => next.run(http).await,
            Err(e) => validation_failed(vec![field_error(&e)]),
        }
    })
}

/// Pull the offending field out of a serde error message where serde names one.
pub fn field_error(error: &serde_json::Error) -> FieldError {
    let message = error.to_string();
    let field = ["missing field `", "unknown field `", "duplicate field `"]
        .iter()
        .find_map(|marker| {
            let start = message.find(marker)? + marker.len();
            let len = message[start..].find('`')?;
            Some(message[start..start + len].to_string())
        })
        .unwrap_or_default();

    let message = match message.find(" at line ") {
        Some(end) => message[..end].to_string(),
        None => message,
    };
    FieldError::new(field, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    #[serde(deny_unknown_fields)]
    struct RemoveFiles {
        files: Vec<String>,
    }

    #[test]
    fn test_missing_field_is_named() {
        let err = serde_json::from_value::<RemoveFiles>(serde_json::json!({})).unwrap_err();
        let field = field_error(&err);
        assert_eq!(field.field, "files");
        assert_eq!(field.message, "missing field `files`");
    }

    #[test]
    fn test_unknown_field_is_named() {
        let err = serde_json::from_value::<RemoveFiles>(serde_json::json!({"files": [], "extra": 1}))
            .unwrap_err();
        assert_eq!(field_error(&err).field, "extra");
    }
}
