use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::model::{self, public_view, CreateUser, UserError, USERS_COLLECTION};
use crate::api::response::{ApiError, JSend};
use crate::api::validate::{field_error, validation_failed};
use crate::db::{DbError, Document};
use crate::routing::Http;

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub message: String,
    pub records: Vec<Document>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: String,
    pub record: Document,
}

fn db_error(http: &Http, e: DbError) -> ApiError {
    tracing::error!(error = %e, "User store unavailable");
    ApiError::from_error(&e, http.state().config.is_development())
}

/// Route: GET /users
pub async fn get_users(http: Http) -> Result<Response, ApiError> {
    let users = http
        .state()
        .db
        .collection(USERS_COLLECTION)
        .await
        .map_err(|e| db_error(&http, e))?;

    let records = users
        .find(&Document::new())
        .await
        .map_err(|e| db_error(&http, e))?
        .iter()
        .map(public_view)
        .collect();

    Ok(JSend::success(UsersResponse {
        message: "Users fetched successfully".to_string(),
        records,
    })
    .into_response())
}

/// Route: POST /users
pub async fn create_user(http: Http) -> Result<Response, ApiError> {
    let input: CreateUser = match http.parse_body() {
        Ok(input) => input,
        Err(e) => return Ok(validation_failed(vec![field_error(&e)])),
    };
    let errors = input.validate();
    if !errors.is_empty() {
        return Ok(validation_failed(errors));
    }

    let users = http
        .state()
        .db
        .collection(USERS_COLLECTION)
        .await
        .map_err(|e| db_error(&http, e))?;

    match model::create_user(users.as_ref(), input).await {
        Ok(user) => Ok((
            StatusCode::CREATED,
            JSend::success(UserResponse {
                message: "User created successfully".to_string(),
                record: public_view(&user),
            }),
        )
            .into_response()),
        Err(UserError::AlreadyExists) => Err(ApiError::conflict("User already exists")),
        Err(UserError::Db(e)) => Err(db_error(&http, e)),
    }
}
